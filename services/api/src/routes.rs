use crate::check::{selector_from, AdDraft};
use crate::infra::{open_session, AppState};
use ad_compliance::error::AppError;
use ad_compliance::submission::{AccessState, Destination, Engine, ResultReport, RewrittenAd};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub(crate) const OPERATOR_EMAIL_HEADER: &str = "x-operator-email";

#[derive(Debug, Deserialize)]
pub(crate) struct CheckRequest {
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) headlines: Vec<String>,
    #[serde(default)]
    pub(crate) descriptions: Vec<String>,
    #[serde(default)]
    pub(crate) primary_text: String,
    #[serde(default)]
    pub(crate) keywords: Option<String>,
    #[serde(default)]
    pub(crate) engine: Option<Engine>,
    #[serde(default)]
    pub(crate) destination: Option<Destination>,
    #[serde(default)]
    pub(crate) rewrite: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckResponse {
    pub(crate) access: AccessState,
    pub(crate) selector: String,
    pub(crate) generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) received_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) report: Option<ResultReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) rewrite: Option<RewrittenAd>,
}

pub(crate) fn compliance_routes() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/ads/check", axum::routing::post(check_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Run one check in a fresh session. The operator comes from the `x-operator-email`
/// header; images are only accepted through the CLI.
pub(crate) async fn check_endpoint(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    let CheckRequest {
        url,
        headlines,
        descriptions,
        primary_text,
        keywords,
        engine,
        destination,
        rewrite,
    } = request;

    let selector = selector_from(engine, destination)?;
    let form = AdDraft {
        url,
        headlines,
        descriptions,
        primary_text,
        keywords,
        images: Vec::new(),
    }
    .into_form()?;

    let email = headers
        .get(OPERATOR_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let session = open_session(state.engines.clone(), state.allow_list.clone(), email).await?;
    session.edit_form(|current| *current = form);

    let record = session.submit(selector).await?.accepted();
    let rewrite = if rewrite {
        session.rewrite().await?.accepted()
    } else {
        None
    };

    Ok(Json(CheckResponse {
        access: session.access_state(),
        selector: selector.to_string(),
        generation: session.generation(),
        received_at: record.as_ref().map(|record| record.received_at),
        report: record.map(|record| record.result.report()),
        rewrite,
    }))
}
