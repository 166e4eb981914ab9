//! Concrete wizards used on the site, and the step pieces they share.

pub mod enquiry;
pub mod property_enquiry;

use super::schema::{ChoiceOption, FieldKind, FieldSpec, ValidationContext, ValidationResult};
use super::submission::SubmissionRecord;
use super::validators;
use super::values::FieldValues;

pub const EMPLOYMENT_STATUSES: &[ChoiceOption] = &[
    ChoiceOption {
        value: "employed",
        label: "Employed",
    },
    ChoiceOption {
        value: "self_employed",
        label: "Self-employed",
    },
    ChoiceOption {
        value: "student",
        label: "Student",
    },
    ChoiceOption {
        value: "retired",
        label: "Retired",
    },
    ChoiceOption {
        value: "unemployed",
        label: "Not currently working",
    },
];

const CONTACT_COLUMNS: &[&str] = &["name", "email", "phone"];
const EMPLOYMENT_COLUMNS: &[&str] = &["employment_status", "job_position", "annual_income"];
const VIEWING_COLUMNS: &[&str] = &["viewing_date", "move_in_date"];

fn contact_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required("name", "Full name", FieldKind::Name),
        FieldSpec::required("email", "Email address", FieldKind::Email),
        FieldSpec::required("phone", "Phone number", FieldKind::Phone),
    ]
}

fn employment_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required("employment_status", "Employment status", FieldKind::Enum)
            .with_options(EMPLOYMENT_STATUSES),
        FieldSpec::optional("job_position", "Job title", FieldKind::Text),
        FieldSpec::optional("annual_income", "Annual income", FieldKind::Amount),
    ]
}

fn viewing_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required("viewing_date", "Viewing date", FieldKind::Date),
        FieldSpec::required("move_in_date", "Move-in date", FieldKind::Date),
    ]
}

/// Working applicants must say what they do and what they earn.
fn check_employment(values: &FieldValues, _: &ValidationContext, result: &mut ValidationResult) {
    let status = values.text("employment_status");
    if status != "employed" && status != "self_employed" {
        return;
    }
    if values.text("job_position").trim().is_empty() {
        result.reject("job_position", "Job title is required");
    }
    if values.text("annual_income").trim().is_empty() {
        result.reject("annual_income", "Annual income is required");
    }
}

/// Viewing strictly after today, move-in strictly after the viewing.
fn check_viewing_dates(
    values: &FieldValues,
    context: &ValidationContext,
    result: &mut ValidationResult,
) {
    let viewing = values.text("viewing_date");
    let move_in = values.text("move_in_date");

    if validators::is_date(viewing) && !validators::is_future_date(viewing, context.today) {
        result.reject("viewing_date", "Viewing date must be in the future");
    }
    if validators::is_date(viewing)
        && validators::is_date(move_in)
        && !validators::is_after(move_in, viewing)
    {
        result.reject("move_in_date", "Move-in date must be after the viewing date");
    }
}

/// Copies `columns` when the step collecting them applied, otherwise writes `null`.
fn put_columns(
    record: &mut SubmissionRecord,
    values: &FieldValues,
    columns: &[&str],
    include: bool,
) {
    for column in columns {
        if include {
            record.copy(column, values, column);
        } else {
            record.put(column, serde_json::Value::Null);
        }
    }
}
