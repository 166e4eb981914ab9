use crate::infra::{progress_label, AppState, LeadDesk, WizardKind};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use estate_leads::error::AppError;
use estate_leads::listings::{CatalogError, ListingType, Property};
use estate_leads::store::{RecordId, RecordStore};
use estate_leads::wizard::{FieldDisplay, FieldValue, Progress, Transition, WizardView};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

type Desk<S> = State<Arc<LeadDesk<S>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenSessionRequest {
    #[serde(default)]
    pub(crate) property_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceRequest {
    pub(crate) step: String,
    pub(crate) value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldRequest {
    pub(crate) name: String,
    pub(crate) value: FieldValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlurRequest {
    pub(crate) name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PropertyQuery {
    #[serde(default, rename = "type")]
    pub(crate) listing_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) session_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) errors: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) selected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) display: Option<FieldDisplay>,
    pub(crate) view: WizardView,
}

impl SessionResponse {
    fn view(session_id: u64, view: WizardView) -> Self {
        Self {
            session_id,
            outcome: None,
            errors: BTreeMap::new(),
            selected: None,
            display: None,
            view,
        }
    }

    fn progress(session_id: u64, progress: Progress, view: WizardView) -> Self {
        let outcome = progress_label(&progress);
        let errors = match progress {
            Progress::Blocked(result) | Progress::Rejected { errors: result, .. } => {
                result.errors().clone()
            }
            _ => BTreeMap::new(),
        };
        Self {
            outcome: Some(outcome),
            errors,
            ..Self::view(session_id, view)
        }
    }
}

pub(crate) fn with_lead_routes<S>(desk: Arc<LeadDesk<S>>) -> Router
where
    S: RecordStore + 'static,
{
    lead_router(desk)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) fn lead_router<S>(desk: Arc<LeadDesk<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/wizards/:wizard/sessions", post(open_session::<S>))
        .route(
            "/api/v1/wizards/sessions/:id",
            get(show_session::<S>).delete(close_session::<S>),
        )
        .route("/api/v1/wizards/sessions/:id/select", post(select::<S>))
        .route("/api/v1/wizards/sessions/:id/toggle", post(toggle::<S>))
        .route("/api/v1/wizards/sessions/:id/field", post(set_field::<S>))
        .route("/api/v1/wizards/sessions/:id/blur", post(blur::<S>))
        .route("/api/v1/wizards/sessions/:id/advance", post(advance::<S>))
        .route("/api/v1/wizards/sessions/:id/retreat", post(retreat::<S>))
        .route("/api/v1/wizards/sessions/:id/submit", post(submit::<S>))
        .route("/api/v1/wizards/sessions/:id/reset", post(reset::<S>))
        .route("/api/v1/wizards/sessions/:id/dismiss", post(dismiss::<S>))
        .route(
            "/api/v1/properties",
            get(list_properties::<S>).post(create_property::<S>),
        )
        .route(
            "/api/v1/properties/slug/:slug",
            get(property_by_slug::<S>),
        )
        .route(
            "/api/v1/properties/:id",
            get(property_by_id::<S>)
                .put(update_property::<S>)
                .delete(delete_property::<S>),
        )
        .with_state(desk)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn open_session<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(wizard): Path<String>,
    payload: Option<Json<OpenSessionRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let kind = WizardKind::parse(&wizard)
        .ok_or_else(|| AppError::BadRequest(format!("unknown wizard '{wizard}'")))?;
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let (id, view) = desk.open(kind, request.property_id.as_deref())?;
    Ok((StatusCode::CREATED, Json(SessionResponse::view(id, view))))
}

pub(crate) async fn show_session<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let view = desk.view(id)?;
    Ok(Json(SessionResponse::view(id, view)))
}

pub(crate) async fn select<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let (progress, view) = desk.drive(id, |session| {
        session.select_option(&request.step, &request.value)
    })?;
    Ok(Json(SessionResponse::progress(id, progress, view)))
}

pub(crate) async fn toggle<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let (selected, view) = desk.with_session(id, |session| {
        let selected = session.toggle_multi_option(&request.step, &request.value)?;
        Ok((selected, session.view()))
    })?;
    Ok(Json(SessionResponse {
        selected: Some(selected),
        ..SessionResponse::view(id, view)
    }))
}

pub(crate) async fn set_field<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
    Json(request): Json<FieldRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let FieldRequest { name, value } = request;
    let view = desk.with_session(id, |session| {
        session.set_field_value(&name, value)?;
        Ok(session.view())
    })?;
    Ok(Json(SessionResponse::view(id, view)))
}

pub(crate) async fn blur<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
    Json(request): Json<BlurRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let (display, view) = desk.with_session(id, |session| {
        let display = session.blur_field(&request.name)?;
        Ok((display, session.view()))
    })?;
    Ok(Json(SessionResponse {
        display: Some(display),
        ..SessionResponse::view(id, view)
    }))
}

pub(crate) async fn advance<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let (progress, view) = desk.drive(id, |session| session.advance())?;
    Ok(Json(SessionResponse::progress(id, progress, view)))
}

pub(crate) async fn retreat<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let (progress, view) = desk.drive(id, |session| session.retreat())?;
    Ok(Json(SessionResponse::progress(id, progress, view)))
}

pub(crate) async fn submit<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let (progress, view) = desk.drive(id, |session| session.submit().map(Transition::Submit))?;
    Ok(Json(SessionResponse::progress(id, progress, view)))
}

pub(crate) async fn reset<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let view = desk.with_session(id, |session| {
        session.reset();
        Ok(session.view())
    })?;
    Ok(Json(SessionResponse::view(id, view)))
}

pub(crate) async fn dismiss<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let view = desk.with_session(id, |session| {
        session.dismiss_error();
        Ok(session.view())
    })?;
    Ok(Json(SessionResponse::view(id, view)))
}

/// Closes the session now and forgets it once the modal's exit transition is over.
pub(crate) async fn close_session<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<u64>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    desk.close(id)?;

    let delay = desk.close_reset_delay();
    let registry = desk.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(err) = registry.release(id) {
            warn!(session = id, error = %err, "failed to release closed session");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "session_id": id, "status": "closed" })),
    ))
}

pub(crate) async fn list_properties<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Query(query): Query<PropertyQuery>,
) -> Result<Json<Vec<Property>>, AppError> {
    let properties = match query.listing_type {
        Some(raw) => {
            let listing_type = ListingType::parse(&raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown listing type '{raw}'")))?;
            desk.catalog().get_by_type(listing_type)?
        }
        None => desk.catalog().get_all()?,
    };
    Ok(Json(properties))
}

pub(crate) async fn property_by_id<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<String>,
) -> Result<Json<Property>, AppError> {
    let property = desk
        .catalog()
        .get_by_id(&RecordId(id))?
        .ok_or(CatalogError::NotFound)?;
    Ok(Json(property))
}

pub(crate) async fn property_by_slug<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(slug): Path<String>,
) -> Result<Json<Property>, AppError> {
    let property = desk
        .catalog()
        .get_by_slug(&slug)?
        .ok_or(CatalogError::NotFound)?;
    Ok(Json(property))
}

pub(crate) async fn create_property<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Json(property): Json<Property>,
) -> Result<(StatusCode, Json<Property>), AppError> {
    let created = desk.catalog().create(property)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn update_property<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<String>,
    Json(property): Json<Property>,
) -> Result<Json<Property>, AppError> {
    let updated = desk.catalog().update(&RecordId(id), property)?;
    Ok(Json(updated))
}

pub(crate) async fn delete_property<S: RecordStore + 'static>(
    State(desk): Desk<S>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    desk.catalog().delete(&RecordId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{sample_listings, seed_listings};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use estate_leads::config::LeadsConfig;
    use estate_leads::store::MemoryRecordStore;
    use estate_leads::wizard::FixedClock;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn desk() -> (Arc<LeadDesk<MemoryRecordStore>>, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new());
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date");
        let desk = LeadDesk::new(
            store.clone(),
            &LeadsConfig::default(),
            Arc::new(FixedClock(today)),
        )
        .expect("desk builds");
        seed_listings(desk.catalog()).expect("seeded");
        (Arc::new(desk), store)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("encode"))),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = router.clone().oneshot(request).await.expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json payload")
        };
        (status, payload)
    }

    async fn open(router: &Router, wizard: &str, body: Option<Value>) -> u64 {
        let (status, payload) = call(
            router,
            "POST",
            &format!("/api/v1/wizards/{wizard}/sessions"),
            body,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{payload}");
        payload["session_id"].as_u64().expect("session id")
    }

    #[tokio::test]
    async fn health_and_readiness_respond() {
        let (desk, _) = desk();
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let router = with_lead_routes(desk).layer(Extension(AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(handle),
        }));

        let (status, payload) = call(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ok");

        let (status, payload) = call(&router, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["status"], "initializing");
    }

    #[tokio::test]
    async fn enquiry_session_branches_on_the_first_choice() {
        let (desk, _) = desk();
        let router = lead_router(desk);
        let id = open(&router, "enquiry", None).await;

        let (status, payload) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/select"),
            Some(json!({ "step": "enquiry_type", "value": "rental" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["outcome"], "moved");
        assert_eq!(payload["view"]["step"]["id"], "property_types");
        assert_eq!(payload["view"]["step"]["total"], 5);
    }

    #[tokio::test]
    async fn field_route_refuses_text_for_a_multi_select() {
        let (desk, store) = desk();
        let router = lead_router(desk);
        let id = open(&router, "enquiry", None).await;
        call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/select"),
            Some(json!({ "step": "enquiry_type", "value": "sale" })),
        )
        .await;

        let (status, payload) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/field"),
            Some(json!({ "name": "property_types", "value": "castle" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"]
            .as_str()
            .is_some_and(|message| message.contains("property_types")));

        let (status, payload) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/advance"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["outcome"], "blocked");
        assert_eq!(payload["view"]["step"]["id"], "property_types");
        assert!(store.records("enquiries").is_empty());
    }

    #[tokio::test]
    async fn blocked_advance_reports_field_errors() {
        let (desk, _) = desk();
        let router = lead_router(desk);
        let property = sample_listings().remove(1);
        let (_, listing) = call(
            &router,
            "GET",
            &format!("/api/v1/properties/slug/{}", estate_leads::listings::slugify(&property.title)),
            None,
        )
        .await;
        let id = open(
            &router,
            "property_enquiry",
            Some(json!({ "property_id": listing["id"] })),
        )
        .await;

        let (status, payload) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/advance"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["outcome"], "blocked");
        assert_eq!(payload["errors"]["name"], "Full name is required");
        assert_eq!(payload["view"]["step"]["id"], "contact");
    }

    #[tokio::test]
    async fn property_enquiry_submits_one_record() {
        let (desk, store) = desk();
        let router = lead_router(desk);
        let (_, listings) = call(&router, "GET", "/api/v1/properties?type=sale", None).await;
        let property_id = listings[0]["id"].clone();
        let id = open(
            &router,
            "property_enquiry",
            Some(json!({ "property_id": property_id })),
        )
        .await;

        for (name, value) in [
            ("name", "Jane Doe"),
            ("email", "jane@example.com"),
            ("phone", "07700 900123"),
        ] {
            let (status, _) = call(
                &router,
                "POST",
                &format!("/api/v1/wizards/sessions/{id}/field"),
                Some(json!({ "name": name, "value": value })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, payload) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/advance"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["outcome"], "confirmed");
        assert_eq!(payload["view"]["confirmation"]["name"], "Jane Doe");
        let rows = store.records(LeadsConfig::DEFAULT_PROPERTY_ENQUIRY_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("property_title"), Some("Garden House"));

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/submit"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn property_enquiry_requires_a_known_listing() {
        let (desk, _) = desk();
        let router = lead_router(desk);

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/wizards/property_enquiry/sessions",
            Some(json!({ "property_id": "properties-999999" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&router, "POST", "/api/v1/wizards/mortgage/sessions", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn closed_sessions_refuse_further_actions() {
        let (desk, _) = desk();
        let router = lead_router(desk);
        let id = open(&router, "enquiry", None).await;

        let (status, payload) = call(
            &router,
            "DELETE",
            &format!("/api/v1/wizards/sessions/{id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(payload["status"], "closed");

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/wizards/sessions/{id}/advance"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&router, "GET", "/api/v1/wizards/sessions/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn property_crud_round_trip() {
        let (desk, _) = desk();
        let router = lead_router(desk);
        let mut property = sample_listings().remove(0);
        property.title = "Dockside Studio".to_string();

        let (status, created) = call(
            &router,
            "POST",
            "/api/v1/properties",
            Some(serde_json::to_value(&property).expect("encode")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["slug"], "dockside-studio");
        let id = created["id"].as_str().expect("id").to_string();

        let mut changed = property.clone();
        changed.price = 1_500;
        let (status, updated) = call(
            &router,
            "PUT",
            &format!("/api/v1/properties/{id}"),
            Some(serde_json::to_value(&changed).expect("encode")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["price"], 1_500);

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/properties",
            Some(serde_json::to_value(&property).expect("encode")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&router, "DELETE", &format!("/api/v1/properties/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, "GET", &format!("/api/v1/properties/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&router, "GET", "/api/v1/properties?type=auction", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
