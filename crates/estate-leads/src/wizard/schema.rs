//! Step schema: the immutable description of a wizard.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::submission::SessionContext;
use super::validators;
use super::values::{FieldValue, FieldValues};

/// Input control a field is rendered with, and the validator it is checked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Name,
    Email,
    Phone,
    Postcode,
    Date,
    Amount,
    Enum,
    MultiSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub options: &'static [ChoiceOption],
}

impl FieldSpec {
    pub const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            options: &[],
        }
    }

    pub const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            options: &[],
        }
    }

    pub const fn with_options(mut self, options: &'static [ChoiceOption]) -> Self {
        self.options = options;
        self
    }

    fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    /// Multi-select fields hold a list of choices; every other kind holds text.
    pub fn takes(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Choices(_) => self.kind == FieldKind::MultiSelect,
            FieldValue::Text(_) => self.kind != FieldKind::MultiSelect,
        }
    }

    /// Message for the first rule `value` breaks, if any.
    pub fn check(&self, value: Option<&FieldValue>) -> Option<String> {
        let value = match value {
            Some(value) if !value.is_blank() => value,
            _ if self.required => return Some(self.missing_message()),
            _ => return None,
        };
        if !self.takes(value) {
            return Some(self.invalid_message());
        }

        let text = value.as_text().unwrap_or_default();
        let accepted = match self.kind {
            FieldKind::Text => true,
            FieldKind::Name => validators::is_name(text),
            FieldKind::Email => validators::is_email(text),
            FieldKind::Phone => validators::is_phone(text),
            FieldKind::Postcode => validators::is_postcode(text),
            FieldKind::Date => validators::is_date(text),
            FieldKind::Amount => validators::is_amount(text),
            FieldKind::Enum => self.has_option(text),
            FieldKind::MultiSelect => value
                .choices()
                .iter()
                .all(|choice| self.has_option(choice)),
        };

        (!accepted).then(|| self.invalid_message())
    }

    fn missing_message(&self) -> String {
        match self.kind {
            FieldKind::Enum => format!("Please choose {}", self.label.to_lowercase()),
            FieldKind::MultiSelect => "Please select at least one option".to_string(),
            _ => format!("{} is required", self.label),
        }
    }

    fn invalid_message(&self) -> String {
        match self.kind {
            FieldKind::Name => format!("{} must be at least 2 characters", self.label),
            FieldKind::Email => "Please enter a valid email address".to_string(),
            FieldKind::Phone => "Please enter a valid phone number".to_string(),
            FieldKind::Postcode => "Please enter a valid UK postcode".to_string(),
            FieldKind::Date => format!("{} must be a date (YYYY-MM-DD)", self.label),
            FieldKind::Amount => format!("{} must be a whole number", self.label),
            FieldKind::Enum | FieldKind::MultiSelect => "Please choose a listed option".to_string(),
            FieldKind::Text => format!("{} is invalid", self.label),
        }
    }
}

/// How a step collects its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// One option picked; picking advances immediately.
    SingleChoice,
    /// Any number of options toggled; advancing needs at least one.
    MultiChoice,
    /// Free-form fields confirmed with an explicit "Next".
    Form,
}

/// Whether a step is shown, given what has been collected so far.
pub type Applicability = fn(&FieldValues, &SessionContext) -> bool;

/// Rules spanning several fields of one step, run after the per-field checks.
pub type StepCheck = fn(&FieldValues, &ValidationContext, &mut ValidationResult);

pub fn always(_: &FieldValues, _: &SessionContext) -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct StepSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: StepKind,
    pub fields: &'static [&'static str],
    pub applies: Applicability,
    pub check: Option<StepCheck>,
}

impl StepSpec {
    pub const fn form(id: &'static str, title: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            id,
            title,
            kind: StepKind::Form,
            fields,
            applies: always,
            check: None,
        }
    }

    pub const fn single_choice(id: &'static str, title: &'static str, field: &'static [&'static str]) -> Self {
        Self {
            id,
            title,
            kind: StepKind::SingleChoice,
            fields: field,
            applies: always,
            check: None,
        }
    }

    pub const fn multi_choice(id: &'static str, title: &'static str, field: &'static [&'static str]) -> Self {
        Self {
            id,
            title,
            kind: StepKind::MultiChoice,
            fields: field,
            applies: always,
            check: None,
        }
    }

    pub const fn when(mut self, applies: Applicability) -> Self {
        self.applies = applies;
        self
    }

    pub const fn checked_by(mut self, check: StepCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub fn owns(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// The single field a choice step writes to.
    pub fn choice_field(&self) -> Option<&'static str> {
        match self.kind {
            StepKind::SingleChoice | StepKind::MultiChoice => self.fields.first().copied(),
            StepKind::Form => None,
        }
    }
}

/// Inputs to validation that do not live in the collected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    /// Records `message` for `field` unless an earlier rule already failed it.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.valid = false;
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema defects. These are programming errors caught by tests, never user input problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("wizard '{0}' declares no steps")]
    NoSteps(&'static str),
    #[error("step id '{0}' is declared twice")]
    DuplicateStep(&'static str),
    #[error("field '{0}' is declared twice")]
    DuplicateField(&'static str),
    #[error("step '{step}' references undeclared field '{field}'")]
    UndeclaredField {
        step: &'static str,
        field: &'static str,
    },
    #[error("field '{field}' is collected by both '{first}' and '{second}'")]
    SharedField {
        field: &'static str,
        first: &'static str,
        second: &'static str,
    },
    #[error("choice step '{0}' must collect exactly one enum or multi-select field")]
    ChoiceShape(&'static str),
    #[error("no step applies to the current answers")]
    NoApplicableSteps,
}

/// Immutable description of one wizard: its fields, and the ordered steps that collect them.
#[derive(Debug, Clone)]
pub struct WizardDefinition {
    key: &'static str,
    title: &'static str,
    fields: Vec<FieldSpec>,
    steps: Vec<StepSpec>,
}

impl WizardDefinition {
    pub fn new(
        key: &'static str,
        title: &'static str,
        fields: Vec<FieldSpec>,
        steps: Vec<StepSpec>,
    ) -> Result<Self, DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::NoSteps(key));
        }

        let mut declared = BTreeSet::new();
        for field in &fields {
            if !declared.insert(field.name) {
                return Err(DefinitionError::DuplicateField(field.name));
            }
        }

        let mut step_ids = BTreeSet::new();
        let mut owners: BTreeMap<&'static str, &'static str> = BTreeMap::new();
        for step in &steps {
            if !step_ids.insert(step.id) {
                return Err(DefinitionError::DuplicateStep(step.id));
            }
            for &field in step.fields {
                if !declared.contains(field) {
                    return Err(DefinitionError::UndeclaredField {
                        step: step.id,
                        field,
                    });
                }
                if let Some(first) = owners.insert(field, step.id) {
                    return Err(DefinitionError::SharedField {
                        field,
                        first,
                        second: step.id,
                    });
                }
            }

            let expected_kind = match step.kind {
                StepKind::SingleChoice => Some(FieldKind::Enum),
                StepKind::MultiChoice => Some(FieldKind::MultiSelect),
                StepKind::Form => None,
            };
            if let Some(expected_kind) = expected_kind {
                let shaped = step.fields.len() == 1
                    && fields
                        .iter()
                        .any(|field| field.name == step.fields[0] && field.kind == expected_kind);
                if !shaped {
                    return Err(DefinitionError::ChoiceShape(step.id));
                }
            }
        }

        Ok(Self {
            key,
            title,
            fields,
            steps,
        })
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> &StepSpec {
        &self.steps[index]
    }

    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn step_fields<'a>(&'a self, step: &'a StepSpec) -> impl Iterator<Item = &'a FieldSpec> + 'a {
        step.fields.iter().filter_map(move |name| self.field(name))
    }

    /// Indices into [`Self::steps`] of every step that currently applies, in order.
    ///
    /// Recomputed on every transition since answers given early can add or remove later steps.
    pub fn applicable_steps(&self, values: &FieldValues, context: &SessionContext) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| (step.applies)(values, context))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn validate_step(
        &self,
        index: usize,
        values: &FieldValues,
        context: &ValidationContext,
    ) -> ValidationResult {
        let step = self.step(index);
        let mut result = ValidationResult::new();
        for field in self.step_fields(step) {
            if let Some(message) = field.check(values.get(field.name)) {
                result.reject(field.name, message);
            }
        }
        if let Some(check) = step.check {
            check(values, context, &mut result);
        }
        result
    }
}
