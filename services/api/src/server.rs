use crate::cli::ServeArgs;
use crate::infra::{
    seed_demo_league, AppState, BufferedNotificationSink, InMemoryAthleteDirectory,
    InMemoryDraftPool, InMemoryRegistrationLedger, InMemoryTeamDirectory,
};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dugout::config::AppConfig;
use dugout::error::AppError;
use dugout::telemetry;
use dugout::workflows::registration::RegistrationService;
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

    let pool = Arc::new(InMemoryDraftPool::default());
    let teams = Arc::new(InMemoryTeamDirectory::default());
    let athletes = Arc::new(InMemoryAthleteDirectory::default());
    let orders = Arc::new(InMemoryRegistrationLedger::default());
    let notifications = Arc::new(BufferedNotificationSink::default());
    seed_demo_league(&teams, &athletes);

    let registration_service = Arc::new(RegistrationService::new(
        pool,
        teams,
        athletes,
        orders,
        notifications,
    ));

    let app = with_registration_routes(registration_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "registration service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
