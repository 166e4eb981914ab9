use chrono::NaiveDate;
use estate_leads::config::LeadsConfig;
use estate_leads::error::AppError;
use estate_leads::listings::{CatalogError, ListingType, Property, PropertyCatalog};
use estate_leads::store::{RecordId, RecordStore};
use estate_leads::wizard::forms::{enquiry, property_enquiry};
use estate_leads::wizard::{
    Clock, Completion, Progress, SessionContext, StoreSubmissionAdapter, SubmissionAdapter,
    SubmitAttempt, Transition, WizardDefinition, WizardError, WizardSession, WizardView,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The two wizards the site mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WizardKind {
    Enquiry,
    PropertyEnquiry,
}

impl WizardKind {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            enquiry::KEY => Some(Self::Enquiry),
            property_enquiry::KEY => Some(Self::PropertyEnquiry),
            _ => None,
        }
    }
}

struct OpenWizard {
    kind: WizardKind,
    session: WizardSession,
}

/// Owns every open wizard session plus the collaborators they submit to.
pub(crate) struct LeadDesk<S> {
    catalog: PropertyCatalog<S>,
    enquiry: Arc<WizardDefinition>,
    property_enquiry: Arc<WizardDefinition>,
    enquiry_adapter: StoreSubmissionAdapter<S>,
    property_adapter: StoreSubmissionAdapter<S>,
    clock: Arc<dyn Clock>,
    close_reset_delay: Duration,
    sessions: Mutex<HashMap<u64, OpenWizard>>,
    next_id: AtomicU64,
}

impl<S> LeadDesk<S>
where
    S: RecordStore,
{
    pub(crate) fn new(
        store: Arc<S>,
        leads: &LeadsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            catalog: PropertyCatalog::new(store.clone(), leads.property_table.clone()),
            enquiry: Arc::new(enquiry::definition()?),
            property_enquiry: Arc::new(property_enquiry::definition()?),
            enquiry_adapter: enquiry::adapter(store.clone(), leads.enquiry_table.clone()),
            property_adapter: property_enquiry::adapter(
                store,
                leads.property_enquiry_table.clone(),
            ),
            clock,
            close_reset_delay: leads.close_reset_delay,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub(crate) fn catalog(&self) -> &PropertyCatalog<S> {
        &self.catalog
    }

    pub(crate) fn close_reset_delay(&self) -> Duration {
        self.close_reset_delay
    }

    /// Opens a session; the per-property form takes its context from the listing.
    pub(crate) fn open(
        &self,
        kind: WizardKind,
        property_id: Option<&str>,
    ) -> Result<(u64, WizardView), AppError> {
        let (definition, context) = match kind {
            WizardKind::Enquiry => (self.enquiry.clone(), SessionContext::general()),
            WizardKind::PropertyEnquiry => {
                let property_id = property_id.ok_or_else(|| {
                    AppError::BadRequest("property_id is required for this wizard".to_string())
                })?;
                let id = RecordId(property_id.to_string());
                let property = self
                    .catalog
                    .get_by_id(&id)?
                    .ok_or(CatalogError::NotFound)?;
                let context =
                    SessionContext::for_property(id.0, property.title, property.listing_type);
                (self.property_enquiry.clone(), context)
            }
        };

        let session = WizardSession::open(definition, context, self.clock.clone())?;
        let view = session.view();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions()?.insert(id, OpenWizard { kind, session });
        Ok((id, view))
    }

    pub(crate) fn view(&self, id: u64) -> Result<WizardView, AppError> {
        self.with_session(id, |session| Ok(session.view()))
    }

    /// Runs a non-submitting action on one session under the registry lock.
    pub(crate) fn with_session<T>(
        &self,
        id: u64,
        action: impl FnOnce(&mut WizardSession) -> Result<T, WizardError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions()?;
        let open = sessions.get_mut(&id).ok_or(AppError::SessionNotFound(id))?;
        Ok(action(&mut open.session)?)
    }

    /// Runs a navigation action. A submission it starts is sent to the store with the registry
    /// unlocked, so the host may close or reset the session meanwhile. If the session is released
    /// before the store answers, the result is discarded and the last view is returned.
    pub(crate) fn drive(
        &self,
        id: u64,
        action: impl FnOnce(&mut WizardSession) -> Result<Transition, WizardError>,
    ) -> Result<(Progress, WizardView), AppError> {
        let (kind, transition, view) = {
            let mut sessions = self.sessions()?;
            let open = sessions.get_mut(&id).ok_or(AppError::SessionNotFound(id))?;
            let transition = action(&mut open.session)?;
            (open.kind, transition, open.session.view())
        };

        let pending = match transition {
            Transition::Moved { from, to } => return Ok((Progress::Moved { from, to }, view)),
            Transition::Stayed => return Ok((Progress::Stayed, view)),
            Transition::Blocked(errors) => return Ok((Progress::Blocked(errors), view)),
            Transition::Submit(SubmitAttempt::InFlight) => return Ok((Progress::InFlight, view)),
            Transition::Submit(SubmitAttempt::Rejected { step, errors }) => {
                return Ok((Progress::Rejected { step, errors }, view))
            }
            Transition::Submit(SubmitAttempt::Started(pending)) => pending,
        };

        let result = self
            .adapter(kind)
            .submit(pending.values(), pending.context());

        let mut sessions = self.sessions()?;
        match sessions.get_mut(&id) {
            Some(open) => {
                let completion = open.session.complete_submission(pending, result);
                Ok((Progress::Submitted(completion), open.session.view()))
            }
            None => {
                debug!(session = id, "session released while submitting; result discarded");
                Ok((Progress::Submitted(Completion::Discarded), view))
            }
        }
    }

    pub(crate) fn close(&self, id: u64) -> Result<(), AppError> {
        self.with_session(id, |session| {
            session.close();
            Ok(())
        })
    }

    /// Drops a closed session. Returns whether it was still registered.
    pub(crate) fn release(&self, id: u64) -> Result<bool, AppError> {
        let removed = self.sessions()?.remove(&id).is_some();
        if removed {
            debug!(session = id, "session released");
        }
        Ok(removed)
    }

    fn adapter(&self, kind: WizardKind) -> &StoreSubmissionAdapter<S> {
        match kind {
            WizardKind::Enquiry => &self.enquiry_adapter,
            WizardKind::PropertyEnquiry => &self.property_adapter,
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<u64, OpenWizard>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Unavailable("session registry lock poisoned".to_string()))
    }
}

/// Name of a [`Progress`] for API payloads.
pub(crate) fn progress_label(progress: &Progress) -> &'static str {
    match progress {
        Progress::Moved { .. } => "moved",
        Progress::Stayed => "stayed",
        Progress::Blocked(_) => "blocked",
        Progress::Rejected { .. } => "rejected",
        Progress::InFlight => "in_flight",
        Progress::Submitted(Completion::Confirmed(_)) => "confirmed",
        Progress::Submitted(Completion::Failed(_)) => "failed",
        Progress::Submitted(Completion::Discarded) => "discarded",
    }
}

/// Listings published when the service starts against an empty in-memory store.
pub(crate) fn sample_listings() -> Vec<Property> {
    vec![
        Property {
            id: None,
            title: "Canal Side Flat".to_string(),
            slug: String::new(),
            listing_type: ListingType::Rent,
            price: 1_450,
            address: "12 Canal Street, London".to_string(),
            postcode: "N1 9GU".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            description: "Bright two bedroom flat overlooking the Regent's Canal.".to_string(),
            features: vec!["Balcony".to_string(), "Bike storage".to_string()],
            images: Vec::new(),
            featured: true,
        },
        Property {
            id: None,
            title: "Garden House".to_string(),
            slug: String::new(),
            listing_type: ListingType::Sale,
            price: 685_000,
            address: "3 Elm Row, Bristol".to_string(),
            postcode: "BS6 5TH".to_string(),
            bedrooms: 3,
            bathrooms: 2,
            description: "Victorian terrace with a south facing garden.".to_string(),
            features: vec!["Garden".to_string(), "Off-street parking".to_string()],
            images: Vec::new(),
            featured: false,
        },
    ]
}

pub(crate) fn seed_listings<S: RecordStore>(
    catalog: &PropertyCatalog<S>,
) -> Result<usize, AppError> {
    if !catalog.get_all()?.is_empty() {
        return Ok(0);
    }
    let mut created = 0;
    for property in sample_listings() {
        catalog.create(property)?;
        created += 1;
    }
    info!(created, "sample listings published");
    Ok(created)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
