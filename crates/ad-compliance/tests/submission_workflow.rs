//! End-to-end checks for the submission facade over real HTTP.
//!
//! A throwaway axum server stands in for the analysis engines so the reqwest transport,
//! multipart encoding, routing, and classification run together.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use ad_compliance::config::EngineConfig;
use ad_compliance::submission::{
    AdImage, AllowList, Destination, DispatchError, Engine, EndpointTable, EngineRouter,
    FieldKind, HttpTransport, Identity, IdentityError, IdentityProvider, ImageAdvisory,
    ScoreTier, SubmissionError, SubmissionOrchestrator,
};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::watch;

const OPERATOR: &str = "ops@example.com";

#[derive(Debug, Clone)]
struct Captured {
    path: &'static str,
    content_type: String,
    body: String,
}

#[derive(Clone, Default)]
struct EngineLog {
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl EngineLog {
    fn record(&self, path: &'static str, headers: &HeaderMap, body: &Bytes) {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.requests.lock().expect("log mutex").push(Captured {
            path,
            content_type,
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }

    fn requests(&self) -> Vec<Captured> {
        self.requests.lock().expect("log mutex").clone()
    }
}

async fn unified(
    State(log): State<EngineLog>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    log.record("/analyze", &headers, &body);
    Json(json!({
        "relevancy_score": 78,
        "image_score": 45,
        "compliant": true,
        "issues": [],
        "suggestions": ["Match the headline to the article title"],
        "cost_usd": 0.0031,
        "tokens": {"prompt": 640, "completion": 120, "total": 760}
    }))
}

async fn fast(State(log): State<EngineLog>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    log.record("/analyze_ad", &headers, &body);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "detail": "model warming up" })),
    )
}

async fn spawn_engine() -> (SocketAddr, EngineLog) {
    let log = EngineLog::default();
    let app = Router::new()
        .route("/analyze", post(unified))
        .route("/analyze_ad", post(fast))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("engine server runs");
    });
    (addr, log)
}

struct OperatorIdentity {
    sender: watch::Sender<Option<Identity>>,
}

impl IdentityProvider for OperatorIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.sender.subscribe()
    }

    async fn sign_in(&self) -> Result<Identity, IdentityError> {
        let identity = Identity::new("uid-ops", OPERATOR);
        self.sender.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sender.send_replace(None);
        Ok(())
    }
}

async fn signed_in_session(
    addr: SocketAddr,
) -> SubmissionOrchestrator<HttpTransport, OperatorIdentity> {
    let config = EngineConfig::with_base_url(&format!("http://{addr}")).expect("valid base url");
    let endpoints = EndpointTable::from_config(&config).expect("valid endpoints");
    let transport = Arc::new(HttpTransport::new(config.request_timeout).expect("client builds"));
    let router = Arc::new(EngineRouter::new(transport, endpoints));
    let (sender, _) = watch::channel(None);
    let allow_list: AllowList = [OPERATOR].into_iter().collect();

    let session = SubmissionOrchestrator::new(
        router,
        Arc::new(OperatorIdentity { sender }),
        Arc::new(allow_list),
    );
    session.sign_in().await.expect("operator signs in");

    session.set_url("https://example.com/articles/home-cleaning");
    session
        .set_entry(FieldKind::Headline, 0, "Amazing Cleaning Services Near You")
        .expect("first headline");
    assert!(session.add_entry(FieldKind::Headline));
    session
        .set_entry(FieldKind::Headline, 1, "Book Today, Clean Tomorrow")
        .expect("second headline");
    session
        .set_entry(
            FieldKind::Description,
            0,
            "Book top-rated professionals instantly",
        )
        .expect("first description");
    session.set_primary_text("Find affordable home cleaning services today.");
    session.set_keywords("happy cleaner");
    session.set_images(vec![AdImage::new("hero.png", b"not-really-a-png".to_vec())
        .with_content_type(mime::IMAGE_PNG)]);
    session
}

#[tokio::test]
async fn destination_submission_round_trips_through_the_unified_endpoint() {
    let (addr, log) = spawn_engine().await;
    let session = signed_in_session(addr).await;

    let record = session
        .submit(Destination::Facebook.into())
        .await
        .expect("dispatch succeeds")
        .accepted()
        .expect("current generation");

    let requests = log.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/analyze");
    assert!(request.content_type.starts_with("multipart/form-data"));
    assert!(request.body.contains("name=\"source\"\r\n\r\nfacebook"));
    assert_eq!(request.body.matches("name=\"headline\"").count(), 2);
    assert!(request.body.contains("filename=\"hero.png\""));
    assert!(request.body.contains("Content-Type: image/png"));

    let report = record.result.report();
    assert_eq!(report.relevancy.tier, ScoreTier::Compliant);
    assert_eq!(report.image.tier, ScoreTier::Warning);
    assert_eq!(
        report.image_advisory,
        Some(ImageAdvisory::RelevanceWarning.label())
    );
    assert_eq!(report.verdict, "Compliant");
    assert!(report.cost.is_some());
}

#[tokio::test]
async fn engine_errors_surface_as_dispatch_failures() {
    let (addr, log) = spawn_engine().await;
    let session = signed_in_session(addr).await;

    match session.submit(Engine::Fast.into()).await {
        Err(SubmissionError::Dispatch(DispatchError::Status { status, .. })) => {
            assert_eq!(status, 503)
        }
        other => panic!("expected HTTP failure, got {other:?}"),
    }

    let requests = log.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/analyze_ad");
    assert!(!requests[0].body.contains("name=\"source\""));
    assert!(session.last_result().is_none());
    assert!(!session.is_dispatching());
}

#[tokio::test]
async fn unreachable_engine_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let session = signed_in_session(addr).await;

    match session.submit(Engine::Gemini.into()).await {
        Err(SubmissionError::Dispatch(DispatchError::Transport(_))) => {}
        other => panic!("expected transport failure, got {other:?}"),
    }
}
