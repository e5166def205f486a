use crate::cli::ServeArgs;
use crate::infra::{build_engine_router, AppState};
use crate::routes::compliance_routes;
use ad_compliance::config::AppConfig;
use ad_compliance::error::AppError;
use ad_compliance::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let allow_list = config.access.allow_list();
    if allow_list.is_empty() {
        warn!("ADCHECK_ALLOWED_EMAILS is empty; every operator will be denied");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engines: Arc::new(build_engine_router(&config.engine)?),
        allow_list: Arc::new(allow_list),
    };

    let app = compliance_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        engine = %config.engine.base_url,
        "ad compliance checker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
