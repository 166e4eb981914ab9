use crate::config::ConfigError;
use crate::listings::CatalogError;
use crate::telemetry::TelemetryError;
use crate::wizard::{DefinitionError, WizardError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Catalog(CatalogError),
    Wizard(WizardError),
    SessionNotFound(u64),
    BadRequest(String),
    Unavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Catalog(err) => match err {
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::SlugTaken(_) => StatusCode::CONFLICT,
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::Decode(_) | CatalogError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Wizard(err) => match err {
                WizardError::Closed
                | WizardError::SubmissionInFlight
                | WizardError::AlreadySubmitted
                | WizardError::StepNotCurrent(_)
                | WizardError::NotOnFinalStep => StatusCode::CONFLICT,
                WizardError::UnknownStep(_)
                | WizardError::NotSingleChoice(_)
                | WizardError::NotMultiChoice(_)
                | WizardError::UnknownOption { .. }
                | WizardError::FieldNotOnStep(_)
                | WizardError::ValueShape(_) => StatusCode::BAD_REQUEST,
                WizardError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Catalog(err) => write!(f, "{}", err),
            AppError::Wizard(err) => write!(f, "{}", err),
            AppError::SessionNotFound(id) => write!(f, "wizard session {} not found", id),
            AppError::BadRequest(message) => write!(f, "bad request: {}", message),
            AppError::Unavailable(message) => write!(f, "service unavailable: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Wizard(err) => Some(err),
            AppError::SessionNotFound(_) | AppError::BadRequest(_) | AppError::Unavailable(_) => {
                None
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<WizardError> for AppError {
    fn from(value: WizardError) -> Self {
        Self::Wizard(value)
    }
}

impl From<DefinitionError> for AppError {
    fn from(value: DefinitionError) -> Self {
        Self::Wizard(value.into())
    }
}
