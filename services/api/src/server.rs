use crate::cli::ServeArgs;
use crate::infra::{seed_listings, AppState, LeadDesk};
use crate::routes::with_lead_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate_leads::config::AppConfig;
use estate_leads::error::AppError;
use estate_leads::store::MemoryRecordStore;
use estate_leads::telemetry;
use estate_leads::wizard::SystemClock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryRecordStore::new());
    let desk = LeadDesk::new(store, &config.leads, Arc::new(SystemClock))?;
    seed_listings(desk.catalog())?;

    let app = with_lead_routes(Arc::new(desk))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead capture service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
