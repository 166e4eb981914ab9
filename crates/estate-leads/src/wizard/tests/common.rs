use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Days, NaiveDate};

use crate::listings::ListingType;
use crate::store::{Fields, MemoryRecordStore, Record, RecordFilter, RecordId, RecordStore, StoreError};
use crate::wizard::forms::{enquiry, property_enquiry};
use crate::wizard::{FixedClock, LeadWizard, SessionContext, StoreSubmissionAdapter, WizardSession};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
}

pub(super) fn days_from_today(days: u64) -> String {
    today()
        .checked_add_days(Days::new(days))
        .expect("date in range")
        .format("%Y-%m-%d")
        .to_string()
}

pub(super) fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(today()))
}

pub(super) fn rental_context() -> SessionContext {
    SessionContext::for_property("prop-000001", "Canal Side Flat", ListingType::Rent)
}

pub(super) fn sale_context() -> SessionContext {
    SessionContext::for_property("prop-000002", "Garden House", ListingType::Sale)
}

pub(super) fn enquiry_session() -> WizardSession {
    let definition = enquiry::definition().expect("enquiry definition is well formed");
    WizardSession::open(Arc::new(definition), SessionContext::general(), clock())
        .expect("session opens")
}

pub(super) fn property_session(context: SessionContext) -> WizardSession {
    let definition =
        property_enquiry::definition().expect("property enquiry definition is well formed");
    WizardSession::open(Arc::new(definition), context, clock()).expect("session opens")
}

pub(super) fn enquiry_wizard<S: RecordStore>(
    store: Arc<S>,
) -> LeadWizard<StoreSubmissionAdapter<S>> {
    LeadWizard::new(enquiry_session(), enquiry::adapter(store, "enquiries"))
}

pub(super) fn property_wizard<S: RecordStore>(
    store: Arc<S>,
    context: SessionContext,
) -> LeadWizard<StoreSubmissionAdapter<S>> {
    LeadWizard::new(
        property_session(context),
        property_enquiry::adapter(store, "property_enquiries"),
    )
}

pub(super) fn fill_contact(session: &mut WizardSession) {
    session.set_field_value("name", "Jane Doe").expect("name on step");
    session
        .set_field_value("email", "jane@example.com")
        .expect("email on step");
    session
        .set_field_value("phone", "07700 900123")
        .expect("phone on step");
}

pub(super) fn fill_employment(session: &mut WizardSession) {
    session
        .set_field_value("employment_status", "employed")
        .expect("status on step");
    session
        .set_field_value("job_position", "Engineer")
        .expect("position on step");
    session
        .set_field_value("annual_income", "45000")
        .expect("income on step");
}

pub(super) fn fill_viewing(session: &mut WizardSession) {
    session
        .set_field_value("viewing_date", days_from_today(1))
        .expect("viewing on step");
    session
        .set_field_value("move_in_date", days_from_today(3))
        .expect("move-in on step");
}

/// Store that fails the first `failures` inserts before delegating to memory.
pub(super) struct FlakyStore {
    failures: AtomicUsize,
    inner: MemoryRecordStore,
    attempts: AtomicUsize,
}

impl FlakyStore {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            inner: MemoryRecordStore::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(super) fn records(&self, table: &str) -> Vec<Record> {
        self.inner.records(table)
    }
}

impl RecordStore for FlakyStore {
    fn insert(&self, table: &str, fields: Fields) -> Result<Record, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert(table, fields)
    }

    fn get(&self, table: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        self.inner.get(table, id)
    }

    fn select(&self, table: &str, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        self.inner.select(table, filter)
    }

    fn update(&self, table: &str, id: &RecordId, fields: Fields) -> Result<Record, StoreError> {
        self.inner.update(table, id, fields)
    }

    fn delete(&self, table: &str, id: &RecordId) -> Result<(), StoreError> {
        self.inner.delete(table, id)
    }
}
