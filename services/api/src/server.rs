use crate::cli::ServeArgs;
use crate::infra::{build_service, load_inventory, AppState, LoggingNotifier};
use crate::routes::with_switch_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use bed_switch::clock::{Clock, SystemClock};
use bed_switch::config::AppConfig;
use bed_switch::error::AppError;
use bed_switch::telemetry;
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

    let inventory = load_inventory(args.inventory.as_deref())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(build_service(
        inventory,
        Arc::new(LoggingNotifier),
        config.switching.limiter(),
        clock,
    ));

    let app = with_switch_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        window_days = config.switching.window_days,
        window_policy = config.switching.policy.label(),
        "bed switch service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
