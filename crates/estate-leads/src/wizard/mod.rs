//! Multi-step lead-capture wizards.

pub mod clock;
pub mod driver;
pub mod forms;
pub mod schema;
pub mod session;
pub mod submission;
pub mod validators;
pub mod values;
pub mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use driver::{LeadWizard, Progress};
pub use schema::{
    ChoiceOption, DefinitionError, FieldKind, FieldSpec, StepKind, StepSpec, ValidationContext,
    ValidationResult, WizardDefinition,
};
pub use session::{
    Completion, Cursor, FieldDisplay, PendingSubmission, SubmissionReceipt, SubmissionStatus,
    SubmitAttempt, Transition, WizardError, WizardSession,
};
pub use submission::{
    RecordMapping, SessionContext, StoreSubmissionAdapter, SubmissionAdapter, SubmissionError,
    SubmissionRecord,
};
pub use values::{FieldValue, FieldValues};
pub use view::{FieldView, StepView, WizardView};

#[cfg(test)]
mod tests;
