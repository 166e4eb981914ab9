//! Inquiry form on a single property's page. Lettings also collect employment and viewing
//! preferences; sales only need contact details.

use std::sync::Arc;

use super::{
    check_employment, check_viewing_dates, contact_fields, employment_fields, put_columns,
    viewing_fields, CONTACT_COLUMNS, EMPLOYMENT_COLUMNS, VIEWING_COLUMNS,
};
use crate::store::RecordStore;
use crate::wizard::schema::{DefinitionError, FieldKind, FieldSpec, StepSpec, WizardDefinition};
use crate::wizard::submission::{SessionContext, StoreSubmissionAdapter, SubmissionRecord};
use crate::wizard::values::FieldValues;

pub const KEY: &str = "property_enquiry";
pub const SOURCE: &str = "property_page";

fn is_letting(_: &FieldValues, context: &SessionContext) -> bool {
    context.is_rental()
}

pub fn definition() -> Result<WizardDefinition, DefinitionError> {
    let mut fields = contact_fields();
    fields.push(FieldSpec::optional("message", "Message", FieldKind::Text));
    fields.extend(employment_fields());
    fields.extend(viewing_fields());

    let steps = vec![
        StepSpec::form("contact", "Your details", &["name", "email", "phone", "message"]),
        StepSpec::form(
            "employment",
            "Employment",
            &["employment_status", "job_position", "annual_income"],
        )
        .when(is_letting)
        .checked_by(check_employment),
        StepSpec::form("viewing", "Viewing and move-in", &["viewing_date", "move_in_date"])
            .when(is_letting)
            .checked_by(check_viewing_dates),
    ];

    WizardDefinition::new(KEY, "Enquire about this property", fields, steps)
}

pub fn record(values: &FieldValues, context: &SessionContext) -> SubmissionRecord {
    let letting = context.is_rental();

    let mut record = SubmissionRecord::new();
    record.put("property_id", context.property_id.clone());
    record.put("property_title", context.property_title.clone());
    record.put(
        "listing_type",
        context.listing_type.map(|listing_type| listing_type.as_str()),
    );
    put_columns(&mut record, values, CONTACT_COLUMNS, true);
    put_columns(&mut record, values, &["message"], true);
    put_columns(&mut record, values, EMPLOYMENT_COLUMNS, letting);
    put_columns(&mut record, values, VIEWING_COLUMNS, letting);
    record.put("source", SOURCE);
    record.put("status", "new");
    record
}

pub fn adapter<S: RecordStore>(
    store: Arc<S>,
    table: impl Into<String>,
) -> StoreSubmissionAdapter<S> {
    StoreSubmissionAdapter::new(store, table, record)
}
