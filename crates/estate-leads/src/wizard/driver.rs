//! Synchronous glue for hosts that can block on the record store (CLI demo, tests).

use super::schema::ValidationResult;
use super::session::{Completion, SubmitAttempt, Transition, WizardError, WizardSession};
use super::submission::SubmissionAdapter;
use super::values::FieldValue;

/// Outcome of one user action once any submission it triggered has finished.
#[derive(Debug)]
pub enum Progress {
    Moved {
        from: &'static str,
        to: &'static str,
    },
    Stayed,
    Blocked(ValidationResult),
    Rejected {
        step: &'static str,
        errors: ValidationResult,
    },
    InFlight,
    Submitted(Completion),
}

/// A session paired with the adapter its submissions go to.
pub struct LeadWizard<A> {
    session: WizardSession,
    adapter: A,
}

impl<A> LeadWizard<A>
where
    A: SubmissionAdapter,
{
    pub fn new(session: WizardSession, adapter: A) -> Self {
        Self { session, adapter }
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut WizardSession {
        &mut self.session
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn fill(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), WizardError> {
        self.session.set_field_value(name, value)?;
        self.session.blur_field(name)?;
        Ok(())
    }

    pub fn select(&mut self, step_id: &str, value: &str) -> Result<Progress, WizardError> {
        let transition = self.session.select_option(step_id, value)?;
        Ok(self.settle(transition))
    }

    pub fn toggle(&mut self, step_id: &str, value: &str) -> Result<bool, WizardError> {
        self.session.toggle_multi_option(step_id, value)
    }

    pub fn advance(&mut self) -> Result<Progress, WizardError> {
        let transition = self.session.advance()?;
        Ok(self.settle(transition))
    }

    pub fn retreat(&mut self) -> Result<Progress, WizardError> {
        let transition = self.session.retreat()?;
        Ok(self.settle(transition))
    }

    pub fn submit(&mut self) -> Result<Progress, WizardError> {
        let attempt = self.session.submit()?;
        Ok(self.run(attempt))
    }

    fn settle(&mut self, transition: Transition) -> Progress {
        match transition {
            Transition::Moved { from, to } => Progress::Moved { from, to },
            Transition::Stayed => Progress::Stayed,
            Transition::Blocked(errors) => Progress::Blocked(errors),
            Transition::Submit(attempt) => self.run(attempt),
        }
    }

    fn run(&mut self, attempt: SubmitAttempt) -> Progress {
        match attempt {
            SubmitAttempt::Started(pending) => {
                let result = self.adapter.submit(pending.values(), pending.context());
                Progress::Submitted(self.session.complete_submission(pending, result))
            }
            SubmitAttempt::InFlight => Progress::InFlight,
            SubmitAttempt::Rejected { step, errors } => Progress::Rejected { step, errors },
        }
    }
}
