//! Presentation binding: a serialisable snapshot of what the host should render.

use serde::Serialize;

use super::schema::{ChoiceOption, FieldKind, StepKind};
use super::session::{Cursor, FieldDisplay, SubmissionReceipt, SubmissionStatus, WizardSession};
use super::values::FieldValue;

#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub wizard: &'static str,
    pub title: &'static str,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepView>,
    /// Retryable failure message for the dismissible banner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<SubmissionReceipt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: StepKind,
    /// Zero-based position among the applicable steps.
    pub position: usize,
    pub total: usize,
    pub fields: Vec<FieldView>,
    pub can_retreat: bool,
    pub is_final: bool,
    pub busy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [ChoiceOption],
    pub display: FieldDisplay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn no_options(options: &&'static [ChoiceOption]) -> bool {
    options.is_empty()
}

impl WizardSession {
    pub fn view(&self) -> WizardView {
        let definition = self.definition();
        let step = match self.cursor() {
            Cursor::Step(index) => {
                let spec = definition.step(index);
                let applicable = self.applicable_steps();
                let position = applicable
                    .iter()
                    .position(|&step| step == index)
                    .unwrap_or_default();
                let fields = definition
                    .step_fields(spec)
                    .map(|field| FieldView {
                        name: field.name,
                        label: field.label,
                        kind: field.kind,
                        required: field.required,
                        value: self.values().get(field.name).cloned(),
                        options: field.options,
                        display: self.field_display(field.name),
                        error: self.visible_error(field.name),
                    })
                    .collect();

                Some(StepView {
                    id: spec.id,
                    title: spec.title,
                    kind: spec.kind,
                    position,
                    total: applicable.len(),
                    fields,
                    can_retreat: position > 0,
                    is_final: position + 1 == applicable.len(),
                    busy: self.status() == SubmissionStatus::Submitting,
                })
            }
            Cursor::Confirmation => None,
        };

        WizardView {
            wizard: definition.key(),
            title: definition.title(),
            status: self.status(),
            step,
            banner: self.failure().map(ToString::to_string),
            confirmation: self.receipt().cloned(),
        }
    }
}
