//! General enquiry modal: buying, renting, or asking for a valuation.

use std::sync::Arc;

use super::{
    check_employment, check_viewing_dates, contact_fields, employment_fields, put_columns,
    viewing_fields, CONTACT_COLUMNS, EMPLOYMENT_COLUMNS, VIEWING_COLUMNS,
};
use crate::store::RecordStore;
use crate::wizard::schema::{
    ChoiceOption, DefinitionError, FieldKind, FieldSpec, StepSpec, WizardDefinition,
};
use crate::wizard::submission::{SessionContext, StoreSubmissionAdapter, SubmissionRecord};
use crate::wizard::values::FieldValues;

pub const KEY: &str = "enquiry";
pub const SOURCE: &str = "enquiry_modal";

pub const ENQUIRY_TYPES: &[ChoiceOption] = &[
    ChoiceOption {
        value: "sale",
        label: "I'm looking to buy",
    },
    ChoiceOption {
        value: "rental",
        label: "I'm looking to rent",
    },
    ChoiceOption {
        value: "valuation",
        label: "I'd like a valuation",
    },
];

pub const PROPERTY_TYPES: &[ChoiceOption] = &[
    ChoiceOption {
        value: "flat",
        label: "Flat / apartment",
    },
    ChoiceOption {
        value: "house",
        label: "House",
    },
    ChoiceOption {
        value: "bungalow",
        label: "Bungalow",
    },
    ChoiceOption {
        value: "maisonette",
        label: "Maisonette",
    },
    ChoiceOption {
        value: "studio",
        label: "Studio",
    },
    ChoiceOption {
        value: "commercial",
        label: "Commercial",
    },
];

fn is_rental(values: &FieldValues, _: &SessionContext) -> bool {
    values.is("enquiry_type", "rental")
}

fn is_search(values: &FieldValues, _: &SessionContext) -> bool {
    values.is("enquiry_type", "sale") || values.is("enquiry_type", "rental")
}

fn is_valuation(values: &FieldValues, _: &SessionContext) -> bool {
    values.is("enquiry_type", "valuation")
}

pub fn definition() -> Result<WizardDefinition, DefinitionError> {
    let mut fields = vec![
        FieldSpec::required("enquiry_type", "Enquiry type", FieldKind::Enum)
            .with_options(ENQUIRY_TYPES),
        FieldSpec::required("property_types", "Property types", FieldKind::MultiSelect)
            .with_options(PROPERTY_TYPES),
        FieldSpec::required("address", "Property address", FieldKind::Text),
        FieldSpec::required("postcode", "Postcode", FieldKind::Postcode),
    ];
    fields.extend(contact_fields());
    fields.extend(employment_fields());
    fields.extend(viewing_fields());

    let steps = vec![
        StepSpec::single_choice("enquiry_type", "How can we help?", &["enquiry_type"]),
        StepSpec::multi_choice(
            "property_types",
            "What kind of property?",
            &["property_types"],
        )
        .when(is_search),
        StepSpec::form(
            "property_address",
            "Which property should we value?",
            &["address", "postcode"],
        )
        .when(is_valuation),
        StepSpec::form("contact", "Your details", &["name", "email", "phone"]),
        StepSpec::form(
            "employment",
            "Employment",
            &["employment_status", "job_position", "annual_income"],
        )
        .when(is_rental)
        .checked_by(check_employment),
        StepSpec::form("viewing", "Viewing and move-in", &["viewing_date", "move_in_date"])
            .when(is_rental)
            .checked_by(check_viewing_dates),
    ];

    WizardDefinition::new(KEY, "Property enquiry", fields, steps)
}

/// `rental` is stored as `rent`, matching the listing type vocabulary.
pub fn stored_type(enquiry_type: &str) -> &str {
    match enquiry_type {
        "rental" => "rent",
        other => other,
    }
}

pub fn record(values: &FieldValues, context: &SessionContext) -> SubmissionRecord {
    let search = is_search(values, context);
    let rental = is_rental(values, context);
    let valuation = is_valuation(values, context);

    let mut record = SubmissionRecord::new();
    record.put("type", stored_type(values.text("enquiry_type")));
    put_columns(&mut record, values, &["property_types"], search);
    put_columns(&mut record, values, &["address"], valuation);
    if valuation {
        record.put("postcode", values.text("postcode").trim().to_ascii_uppercase());
    } else {
        record.put("postcode", serde_json::Value::Null);
    }
    put_columns(&mut record, values, CONTACT_COLUMNS, true);
    put_columns(&mut record, values, EMPLOYMENT_COLUMNS, rental);
    put_columns(&mut record, values, VIEWING_COLUMNS, rental);
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
