//! The wizard state machine.
//!
//! A [`WizardSession`] is owned by exactly one open modal or form. Every user action maps to one
//! method here; the only asynchronous boundary is the record-store call, which is split into
//! [`WizardSession::submit`] (hands out a [`PendingSubmission`]) and
//! [`WizardSession::complete_submission`] (applies the adapter's answer).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::schema::{DefinitionError, StepKind, StepSpec, ValidationContext, ValidationResult, WizardDefinition};
use super::submission::{SessionContext, SubmissionError};
use super::values::{FieldValue, FieldValues};
use crate::store::RecordId;

/// Render state of one field's validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDisplay {
    Untouched,
    Touched,
    /// The field failed validation on blur or on an advance attempt; its message is visible.
    ErrorShown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Idle => "idle",
            SubmissionStatus::Submitting => "submitting",
            SubmissionStatus::Succeeded => "succeeded",
            SubmissionStatus::Failed => "failed",
        }
    }
}

/// Where the session is: on a content step (index into the definition) or on the terminal
/// confirmation screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Step(usize),
    Confirmation,
}

/// What the confirmation screen shows once the store accepted the enquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub record_id: RecordId,
    pub name: String,
    pub email: String,
}

/// Ticket for the one in-flight submission of a session.
#[derive(Debug)]
pub struct PendingSubmission {
    generation: u64,
    values: FieldValues,
    context: SessionContext,
}

impl PendingSubmission {
    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub enum Transition {
    Moved {
        from: &'static str,
        to: &'static str,
    },
    /// Retreat from the first applicable step.
    Stayed,
    Blocked(ValidationResult),
    Submit(SubmitAttempt),
}

#[derive(Debug)]
pub enum SubmitAttempt {
    Started(PendingSubmission),
    /// A submission is already running; nothing was done.
    InFlight,
    /// Full validation failed on `step`; the cursor moved there.
    Rejected {
        step: &'static str,
        errors: ValidationResult,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Confirmed(SubmissionReceipt),
    Failed(SubmissionError),
    /// The session was closed or reset while the call was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("the wizard has been closed")]
    Closed,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("this enquiry has already been sent; start another to continue")]
    AlreadySubmitted,
    #[error("step '{0}' does not exist")]
    UnknownStep(String),
    #[error("step '{0}' is not the current step")]
    StepNotCurrent(String),
    #[error("step '{0}' does not take a single choice")]
    NotSingleChoice(String),
    #[error("step '{0}' does not take multiple choices")]
    NotMultiChoice(String),
    #[error("step '{step}' has no option '{value}'")]
    UnknownOption { step: String, value: String },
    #[error("field '{0}' is not collected on the current step")]
    FieldNotOnStep(String),
    #[error("field '{0}' does not take a value of that shape")]
    ValueShape(String),
    #[error("submit is only available from the final step")]
    NotOnFinalStep,
    #[error(transparent)]
    Configuration(#[from] DefinitionError),
}

pub struct WizardSession {
    definition: Arc<WizardDefinition>,
    context: SessionContext,
    clock: Arc<dyn Clock>,
    first_step: usize,
    cursor: Cursor,
    values: FieldValues,
    display: BTreeMap<&'static str, FieldDisplay>,
    status: SubmissionStatus,
    failure: Option<SubmissionError>,
    receipt: Option<SubmissionReceipt>,
    generation: u64,
    open: bool,
}

impl fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardSession")
            .field("wizard", &self.definition.key())
            .field("cursor", &self.cursor)
            .field("status", &self.status)
            .field("generation", &self.generation)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl WizardSession {
    pub fn open(
        definition: Arc<WizardDefinition>,
        context: SessionContext,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WizardError> {
        let first_step = definition
            .applicable_steps(&FieldValues::new(), &context)
            .first()
            .copied()
            .ok_or(DefinitionError::NoApplicableSteps)?;

        info!(wizard = definition.key(), property = ?context.property_id, "wizard opened");

        Ok(Self {
            definition,
            context,
            clock,
            first_step,
            cursor: Cursor::Step(first_step),
            values: FieldValues::new(),
            display: BTreeMap::new(),
            status: SubmissionStatus::Idle,
            failure: None,
            receipt: None,
            generation: 0,
            open: true,
        })
    }

    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&SubmissionError> {
        self.failure.as_ref()
    }

    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn field_display(&self, name: &str) -> FieldDisplay {
        self.display
            .get(name)
            .copied()
            .unwrap_or(FieldDisplay::Untouched)
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.field_display(name) != FieldDisplay::Untouched
    }

    pub fn current_step(&self) -> Option<&StepSpec> {
        match self.cursor {
            Cursor::Step(index) => Some(self.definition.step(index)),
            Cursor::Confirmation => None,
        }
    }

    /// Indices of the steps that apply to the answers collected so far.
    pub fn applicable_steps(&self) -> Vec<usize> {
        self.definition.applicable_steps(&self.values, &self.context)
    }

    /// Position of the cursor within the applicable steps; `None` on the confirmation screen.
    pub fn current_step_index(&self) -> Option<usize> {
        let Cursor::Step(index) = self.cursor else {
            return None;
        };
        self.applicable_steps().iter().position(|&step| step == index)
    }

    pub fn is_final_step(&self) -> bool {
        match self.cursor {
            Cursor::Step(index) => self.applicable_steps().last() == Some(&index),
            Cursor::Confirmation => false,
        }
    }

    /// Current validation errors of the cursor's step, whether or not they are displayed yet.
    pub fn errors(&self) -> BTreeMap<String, String> {
        match self.cursor {
            Cursor::Step(index) => self.validate(index).errors().clone(),
            Cursor::Confirmation => BTreeMap::new(),
        }
    }

    /// The message to render under `name`, honouring its display state.
    pub fn visible_error(&self, name: &str) -> Option<String> {
        if self.field_display(name) != FieldDisplay::ErrorShown {
            return None;
        }
        let Cursor::Step(index) = self.cursor else {
            return None;
        };
        self.validate(index).error(name).map(str::to_string)
    }

    /// Pure state mutation for a keystroke or change event. Does not mark the field touched.
    pub fn set_field_value(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), WizardError> {
        let index = self.editable_step()?;
        let field = self.owned_field(index, name)?;
        let value = value.into();
        if !self
            .definition
            .field(field)
            .is_some_and(|spec| spec.takes(&value))
        {
            return Err(WizardError::ValueShape(field.to_string()));
        }
        self.values.set(field, value);
        self.settle_shown_error(index, field);
        Ok(())
    }

    /// Blur event: trims text input and decides whether the field's error becomes visible.
    pub fn blur_field(&mut self, name: &str) -> Result<FieldDisplay, WizardError> {
        let index = self.editable_step()?;
        let field = self.owned_field(index, name)?;

        let trimmed = match self.values.get(field) {
            Some(FieldValue::Text(text)) if text.trim().len() != text.len() => {
                Some(text.trim().to_string())
            }
            _ => None,
        };
        if let Some(trimmed) = trimmed {
            self.values.set(field, FieldValue::Text(trimmed));
        }

        let display = if self.validate(index).error(field).is_some() {
            FieldDisplay::ErrorShown
        } else {
            FieldDisplay::Touched
        };
        self.display.insert(field, display);
        Ok(display)
    }

    /// Single-choice steps: record the pick and advance straight away.
    pub fn select_option(&mut self, step_id: &str, value: &str) -> Result<Transition, WizardError> {
        let index = self.editable_step()?;
        let field = self.choice_field(index, step_id, StepKind::SingleChoice, value)?;

        self.values.set(field, FieldValue::from(value));
        self.display.insert(field, FieldDisplay::Touched);
        debug!(wizard = self.definition.key(), step = step_id, value, "option selected");
        self.advance()
    }

    /// Multi-select steps: flip `value` in the selection. Returns whether it is now selected.
    pub fn toggle_multi_option(&mut self, step_id: &str, value: &str) -> Result<bool, WizardError> {
        let index = self.editable_step()?;
        let field = self.choice_field(index, step_id, StepKind::MultiChoice, value)?;

        let selected = self.values.toggle_choice(field, value);
        if self.field_display(field) == FieldDisplay::Untouched {
            self.display.insert(field, FieldDisplay::Touched);
        }
        self.settle_shown_error(index, field);
        Ok(selected)
    }

    /// Validates the current step and, if it passes, moves to the next applicable step or
    /// starts the submission when this was the last one.
    pub fn advance(&mut self) -> Result<Transition, WizardError> {
        let index = self.editable_step()?;
        let result = self.validate(index);
        if !result.is_valid() {
            self.reveal(index, &result);
            debug!(
                wizard = self.definition.key(),
                step = self.definition.step(index).id,
                errors = result.errors().len(),
                "advance blocked"
            );
            return Ok(Transition::Blocked(result));
        }

        let applicable = self.applicable()?;
        match applicable.into_iter().find(|&step| step > index) {
            Some(next) => {
                let from = self.definition.step(index).id;
                let to = self.definition.step(next).id;
                self.cursor = Cursor::Step(next);
                debug!(wizard = self.definition.key(), from, to, "step advanced");
                Ok(Transition::Moved { from, to })
            }
            None => self.submit().map(Transition::Submit),
        }
    }

    /// Back to the previous applicable step. Never validates and never clears values.
    pub fn retreat(&mut self) -> Result<Transition, WizardError> {
        let index = self.editable_step()?;
        if self.status == SubmissionStatus::Failed {
            self.dismiss_error();
        }

        let applicable = self.applicable()?;
        let Some(previous) = applicable.into_iter().rev().find(|&step| step < index) else {
            return Ok(Transition::Stayed);
        };

        let from = self.definition.step(index).id;
        let to = self.definition.step(previous).id;
        self.cursor = Cursor::Step(previous);
        debug!(wizard = self.definition.key(), from, to, "step retreated");
        Ok(Transition::Moved { from, to })
    }

    /// Re-validates every applicable step and hands out the ticket for the store call.
    ///
    /// A no-op while a submission is in flight; retryable after a failure.
    pub fn submit(&mut self) -> Result<SubmitAttempt, WizardError> {
        if !self.open {
            return Err(WizardError::Closed);
        }
        match self.status {
            SubmissionStatus::Submitting => return Ok(SubmitAttempt::InFlight),
            SubmissionStatus::Succeeded => return Err(WizardError::AlreadySubmitted),
            SubmissionStatus::Idle | SubmissionStatus::Failed => {}
        }
        let Cursor::Step(index) = self.cursor else {
            return Err(WizardError::AlreadySubmitted);
        };

        let applicable = self.applicable()?;
        if applicable.last() != Some(&index) {
            return Err(WizardError::NotOnFinalStep);
        }

        for step_index in applicable {
            let result = self.validate(step_index);
            if !result.is_valid() {
                let step = self.definition.step(step_index).id;
                self.cursor = Cursor::Step(step_index);
                self.reveal(step_index, &result);
                warn!(wizard = self.definition.key(), step, "submission rejected by validation");
                return Ok(SubmitAttempt::Rejected {
                    step,
                    errors: result,
                });
            }
        }

        self.status = SubmissionStatus::Submitting;
        self.failure = None;
        info!(
            wizard = self.definition.key(),
            generation = self.generation,
            "submission started"
        );

        Ok(SubmitAttempt::Started(PendingSubmission {
            generation: self.generation,
            values: self.values.clone(),
            context: self.context.clone(),
        }))
    }

    /// Applies the adapter's answer to the submission `pending` was issued for.
    pub fn complete_submission(
        &mut self,
        pending: PendingSubmission,
        result: Result<RecordId, SubmissionError>,
    ) -> Completion {
        if !self.open
            || pending.generation != self.generation
            || self.status != SubmissionStatus::Submitting
        {
            debug!(
                wizard = self.definition.key(),
                ticket = pending.generation,
                live = self.generation,
                "stale submission result discarded"
            );
            return Completion::Discarded;
        }

        match result {
            Ok(record_id) => {
                let receipt = SubmissionReceipt {
                    record_id,
                    name: self.values.text("name").trim().to_string(),
                    email: self.values.text("email").trim().to_string(),
                };
                info!(
                    wizard = self.definition.key(),
                    record = %receipt.record_id,
                    "submission confirmed"
                );
                self.status = SubmissionStatus::Succeeded;
                self.cursor = Cursor::Confirmation;
                self.receipt = Some(receipt.clone());
                Completion::Confirmed(receipt)
            }
            Err(error) => {
                warn!(wizard = self.definition.key(), error = %error, "submission failed");
                self.status = SubmissionStatus::Failed;
                self.failure = Some(error.clone());
                Completion::Failed(error)
            }
        }
    }

    /// Dismisses the failure banner. Returns whether there was one.
    pub fn dismiss_error(&mut self) -> bool {
        if self.status != SubmissionStatus::Failed {
            return false;
        }
        self.status = SubmissionStatus::Idle;
        self.failure = None;
        true
    }

    /// Back to the first step with nothing collected. Any in-flight result will be discarded.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.cursor = Cursor::Step(self.first_step);
        self.values = FieldValues::new();
        self.display.clear();
        self.status = SubmissionStatus::Idle;
        self.failure = None;
        self.receipt = None;
        self.open = true;
        debug!(wizard = self.definition.key(), generation = self.generation, "wizard reset");
    }

    /// The host closed the wizard. Later results for this session are discarded.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.generation += 1;
        info!(
            wizard = self.definition.key(),
            in_flight = self.status == SubmissionStatus::Submitting,
            "wizard closed"
        );
    }

    fn validate(&self, index: usize) -> ValidationResult {
        let context = ValidationContext {
            today: self.clock.today(),
        };
        self.definition.validate_step(index, &self.values, &context)
    }

    fn applicable(&self) -> Result<Vec<usize>, WizardError> {
        let applicable = self.applicable_steps();
        if applicable.is_empty() {
            return Err(DefinitionError::NoApplicableSteps.into());
        }
        Ok(applicable)
    }

    fn editable_step(&self) -> Result<usize, WizardError> {
        if !self.open {
            return Err(WizardError::Closed);
        }
        match (self.status, self.cursor) {
            (SubmissionStatus::Submitting, _) => Err(WizardError::SubmissionInFlight),
            (SubmissionStatus::Succeeded, _) | (_, Cursor::Confirmation) => {
                Err(WizardError::AlreadySubmitted)
            }
            (_, Cursor::Step(index)) => Ok(index),
        }
    }

    fn owned_field(&self, index: usize, name: &str) -> Result<&'static str, WizardError> {
        self.definition
            .step(index)
            .fields
            .iter()
            .copied()
            .find(|field| *field == name)
            .ok_or_else(|| WizardError::FieldNotOnStep(name.to_string()))
    }

    fn choice_field(
        &self,
        index: usize,
        step_id: &str,
        kind: StepKind,
        value: &str,
    ) -> Result<&'static str, WizardError> {
        let step = self.definition.step(index);
        if step.id != step_id {
            return Err(match self.definition.step_index(step_id) {
                Some(_) => WizardError::StepNotCurrent(step_id.to_string()),
                None => WizardError::UnknownStep(step_id.to_string()),
            });
        }

        let field = match (step.kind, kind) {
            (StepKind::SingleChoice, StepKind::SingleChoice)
            | (StepKind::MultiChoice, StepKind::MultiChoice) => step.choice_field(),
            (_, StepKind::MultiChoice) => return Err(WizardError::NotMultiChoice(step_id.to_string())),
            _ => return Err(WizardError::NotSingleChoice(step_id.to_string())),
        }
        .ok_or(DefinitionError::ChoiceShape(step.id))?;

        let offered = self
            .definition
            .field(field)
            .is_some_and(|spec| spec.options.iter().any(|option| option.value == value));
        if !offered {
            return Err(WizardError::UnknownOption {
                step: step_id.to_string(),
                value: value.to_string(),
            });
        }
        Ok(field)
    }

    /// Marks every field of the step touched, showing the ones that failed.
    fn reveal(&mut self, index: usize, result: &ValidationResult) {
        let fields = self.definition.step(index).fields;
        for &field in fields {
            let display = if result.error(field).is_some() {
                FieldDisplay::ErrorShown
            } else {
                FieldDisplay::Touched
            };
            self.display.insert(field, display);
        }
    }

    /// A shown error clears as soon as the field becomes valid; new errors wait for blur.
    fn settle_shown_error(&mut self, index: usize, field: &'static str) {
        if self.field_display(field) == FieldDisplay::ErrorShown
            && self.validate(index).error(field).is_none()
        {
            self.display.insert(field, FieldDisplay::Touched);
        }
    }
}
