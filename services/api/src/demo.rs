use crate::infra::{parse_date, seed_listings};
use chrono::{Days, Local, NaiveDate};
use clap::Args;
use estate_leads::config::LeadsConfig;
use estate_leads::error::AppError;
use estate_leads::listings::{ListingType, PropertyCatalog};
use estate_leads::store::{MemoryRecordStore, RecordFilter, RecordId, RecordStore};
use estate_leads::wizard::forms::{enquiry, property_enquiry};
use estate_leads::wizard::{
    Completion, FieldValues, FixedClock, LeadWizard, Progress, SessionContext,
    StoreSubmissionAdapter, SubmissionAdapter, SubmissionError, WizardSession, WizardView,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date treated as today for viewing-date rules (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Fail the first enquiry insert to show the retry banner.
    #[arg(long)]
    pub(crate) simulate_outage: bool,
    /// Skip the per-property enquiry portion of the demo.
    #[arg(long)]
    pub(crate) skip_property: bool,
}

/// Adapter that refuses its first call, then behaves like the wrapped one.
struct OutageOnce<A> {
    inner: A,
    tripped: AtomicBool,
}

impl<A: SubmissionAdapter> SubmissionAdapter for OutageOnce<A> {
    fn submit(
        &self,
        values: &FieldValues,
        context: &SessionContext,
    ) -> Result<RecordId, SubmissionError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(SubmissionError::Unavailable("backend timed out".to_string()));
        }
        self.inner.submit(values, context)
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        simulate_outage,
        skip_property,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let clock = Arc::new(FixedClock(today));
    let leads = LeadsConfig::default();
    let store = Arc::new(MemoryRecordStore::new());
    let catalog = PropertyCatalog::new(store.clone(), leads.property_table.clone());
    seed_listings(&catalog)?;

    println!("Lead capture demo (today = {today})");

    println!("\nGeneral enquiry: renting a flat");
    let session = WizardSession::open(
        Arc::new(enquiry::definition()?),
        SessionContext::general(),
        clock.clone(),
    )?;
    let adapter = OutageOnce {
        inner: enquiry::adapter(store.clone(), leads.enquiry_table.clone()),
        tripped: AtomicBool::new(!simulate_outage),
    };
    let mut wizard = LeadWizard::new(session, adapter);
    print_view(&wizard.session().view());

    report(&wizard.select("enquiry_type", "rental")?);
    wizard.toggle("property_types", "flat")?;
    wizard.toggle("property_types", "maisonette")?;
    print_view(&wizard.session().view());
    report(&wizard.advance()?);

    wizard.fill("name", "Jane Doe")?;
    wizard.fill("email", "jane@example.com")?;
    wizard.fill("phone", "07700 900123")?;
    report(&wizard.advance()?);

    wizard.fill("employment_status", "employed")?;
    wizard.fill("job_position", "Software engineer")?;
    wizard.fill("annual_income", "£48,000")?;
    report(&wizard.advance()?);

    wizard.fill("viewing_date", date_after(today, 2))?;
    wizard.fill("move_in_date", date_after(today, 30))?;
    print_view(&wizard.session().view());
    let mut outcome = wizard.advance()?;
    report(&outcome);
    if let Progress::Submitted(Completion::Failed(_)) = outcome {
        println!("  retrying without re-entering anything");
        outcome = wizard.submit()?;
        report(&outcome);
    }
    print_records(store.as_ref(), &leads.enquiry_table)?;

    if skip_property {
        return Ok(());
    }

    let Some(listing) = catalog.get_by_type(ListingType::Sale)?.into_iter().next() else {
        println!("\nNo sale listings to enquire about");
        return Ok(());
    };
    let Some(listing_id) = listing.id.clone() else {
        return Ok(());
    };

    println!("\nProperty enquiry: {} ({})", listing.title, listing.slug);
    let session = WizardSession::open(
        Arc::new(property_enquiry::definition()?),
        SessionContext::for_property(listing_id.0, listing.title, listing.listing_type),
        clock,
    )?;
    let adapter: StoreSubmissionAdapter<MemoryRecordStore> =
        property_enquiry::adapter(store.clone(), leads.property_enquiry_table.clone());
    let mut wizard = LeadWizard::new(session, adapter);
    print_view(&wizard.session().view());

    println!("  pressing Next with nothing filled in");
    report(&wizard.advance()?);
    print_view(&wizard.session().view());

    wizard.fill("name", "Sam Carter")?;
    wizard.fill("email", "sam@example.org")?;
    wizard.fill("phone", "+44 20 7946 0000")?;
    wizard.fill("message", "Is the garden south facing?")?;
    report(&wizard.advance()?);
    print_records(store.as_ref(), &leads.property_enquiry_table)?;

    Ok(())
}

fn date_after(today: NaiveDate, days: u64) -> String {
    today
        .checked_add_days(Days::new(days))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

fn print_view(view: &WizardView) {
    match &view.step {
        Some(step) => {
            println!(
                "  [{}/{}] {} ({})",
                step.position + 1,
                step.total,
                step.title,
                step.id
            );
            for field in &step.fields {
                let options = field
                    .options
                    .iter()
                    .map(|option| option.value)
                    .collect::<Vec<_>>();
                let error = field
                    .error
                    .as_deref()
                    .map(|error| format!(" ! {error}"))
                    .unwrap_or_default();
                if options.is_empty() {
                    println!("      - {}{}", field.label, error);
                } else {
                    println!("      - {} [{}]{}", field.label, options.join(", "), error);
                }
            }
        }
        None => println!("  [done] {}", view.title),
    }
    if let Some(banner) = &view.banner {
        println!("  banner: {banner}");
    }
}

fn report(progress: &Progress) {
    match progress {
        Progress::Moved { from, to } => println!("  {from} -> {to}"),
        Progress::Stayed => println!("  stayed on the first step"),
        Progress::Blocked(errors) | Progress::Rejected { errors, .. } => {
            for (field, message) in errors.errors() {
                println!("  {field}: {message}");
            }
        }
        Progress::InFlight => println!("  submission already in flight"),
        Progress::Submitted(Completion::Confirmed(receipt)) => println!(
            "  thank you {}, we will be in touch at {} (record {})",
            receipt.name, receipt.email, receipt.record_id
        ),
        Progress::Submitted(Completion::Failed(error)) => println!("  failed: {error}"),
        Progress::Submitted(Completion::Discarded) => println!("  result discarded"),
    }
}

fn print_records<S: RecordStore>(store: &S, table: &str) -> Result<(), AppError> {
    let rows = store
        .select(table, &RecordFilter::all())
        .map_err(|err| AppError::Unavailable(err.to_string()))?;
    println!("  {} record(s) in '{table}':", rows.len());
    for row in rows {
        let rendered = serde_json::to_string_pretty(&row.fields)
            .unwrap_or_else(|_| format!("{:?}", row.fields));
        println!("  {}: {}", row.id, rendered.replace('\n', "\n    "));
    }
    Ok(())
}
