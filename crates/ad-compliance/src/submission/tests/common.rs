use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::{watch, Notify};
use url::Url;

use crate::config::EngineConfig;
use crate::submission::auth::{AllowList, Identity, IdentityError, IdentityProvider};
use crate::submission::domain::{AdImage, FormState};
use crate::submission::fields::FieldArray;
use crate::submission::orchestrator::SubmissionOrchestrator;
use crate::submission::router::{
    EndpointTable, EngineRouter, MultipartForm, Transport, TransportError, TransportResponse,
};

pub(super) const OPERATOR: &str = "ops@example.com";
pub(super) const INTRUDER: &str = "someone@elsewhere.net";

pub(super) type TestOrchestrator = SubmissionOrchestrator<RecordingTransport, RecordingIdentity>;

pub(super) fn analysis_body(relevancy: f64, image: Option<f64>, compliant: bool) -> Vec<u8> {
    let mut body = json!({
        "relevancy_score": relevancy,
        "compliant": compliant,
        "issues": ["Headline promises results the article does not cover"],
        "suggestions": ["Mention the service area in the headline"],
    });
    if let Some(image) = image {
        body["image_score"] = json!(image);
    }
    serde_json::to_vec(&body).expect("serializable body")
}

pub(super) fn ok(body: Vec<u8>) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse { status: 200, body })
}

/// Records every post and replays queued responses; optionally waits for a release
/// signal before answering.
#[derive(Default)]
pub(super) struct RecordingTransport {
    calls: Mutex<Vec<(Url, MultipartForm)>>,
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    release: Option<Arc<Notify>>,
}

impl RecordingTransport {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn gated(release: Arc<Notify>) -> Self {
        Self {
            release: Some(release),
            ..Self::default()
        }
    }

    pub(super) fn respond(self, response: Result<TransportResponse, TransportError>) -> Self {
        self.responses
            .lock()
            .expect("responses mutex")
            .push_back(response);
        self
    }

    pub(super) fn calls(&self) -> Vec<(Url, MultipartForm)> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("calls mutex").len()
    }
}

impl Transport for RecordingTransport {
    async fn post(
        &self,
        endpoint: &Url,
        form: MultipartForm,
    ) -> Result<TransportResponse, TransportError> {
        self.calls
            .lock()
            .expect("calls mutex")
            .push((endpoint.clone(), form));

        if let Some(release) = &self.release {
            release.notified().await;
        }

        let queued = self.responses.lock().expect("responses mutex").pop_front();
        queued.unwrap_or_else(|| ok(analysis_body(82.0, Some(64.0), true)))
    }
}

pub(super) struct RecordingIdentity {
    sender: watch::Sender<Option<Identity>>,
    next_identity: Option<Identity>,
    sign_outs: AtomicUsize,
    fail_sign_out: bool,
}

impl RecordingIdentity {
    pub(super) fn signing_in_as(email: &str) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            next_identity: Some(Identity::new(format!("uid-{email}"), email)),
            sign_outs: AtomicUsize::new(0),
            fail_sign_out: false,
        }
    }

    pub(super) fn cancelling() -> Self {
        Self {
            next_identity: None,
            ..Self::signing_in_as(OPERATOR)
        }
    }

    pub(super) fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    /// Publish an identity change the way the provider would after an external login.
    pub(super) fn push(&self, identity: Option<Identity>) {
        self.sender.send_replace(identity);
    }

    pub(super) fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for RecordingIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.sender.subscribe()
    }

    async fn sign_in(&self) -> Result<Identity, IdentityError> {
        let identity = self.next_identity.clone().ok_or(IdentityError::Cancelled)?;
        self.sender.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out {
            return Err(IdentityError::Unavailable("popup closed".to_string()));
        }
        self.sender.send_replace(None);
        Ok(())
    }
}

pub(super) fn allow_list() -> Arc<AllowList> {
    Arc::new([OPERATOR, "reviewer@example.com"].into_iter().collect())
}

pub(super) fn endpoints() -> EndpointTable {
    let config = EngineConfig::with_base_url("http://engines.test").expect("valid base url");
    EndpointTable::from_config(&config).expect("valid endpoint paths")
}

pub(super) fn router(transport: Arc<RecordingTransport>) -> EngineRouter<RecordingTransport> {
    EngineRouter::new(transport, endpoints())
}

pub(super) fn orchestrator(
    transport: Arc<RecordingTransport>,
    identity: Arc<RecordingIdentity>,
) -> TestOrchestrator {
    SubmissionOrchestrator::new(Arc::new(router(transport)), identity, allow_list())
}

pub(super) fn hero_image() -> AdImage {
    AdImage::new("hero.png", vec![0x89, b'P', b'N', b'G']).with_content_type(mime::IMAGE_PNG)
}

pub(super) fn filled_form() -> FormState {
    FormState {
        url: "https://example.com/articles/home-cleaning".to_string(),
        headlines: FieldArray::from_entries(["Buy Now", "Spring Cleaning Deals", ""])
            .expect("within limits"),
        descriptions: FieldArray::from_entries(["Book top-rated professionals instantly", "  "])
            .expect("within limits"),
        primary_text: "Find affordable home cleaning services today.".to_string(),
        keywords: "woman vacuuming, kitchen cleanup".to_string(),
        images: vec![hero_image()],
    }
}

/// Orchestrator already signed in as an allowed operator with a complete form.
pub(super) async fn ready_orchestrator(transport: Arc<RecordingTransport>) -> TestOrchestrator {
    let identity = Arc::new(RecordingIdentity::signing_in_as(OPERATOR));
    let orchestrator = orchestrator(transport, identity);
    orchestrator.sign_in().await.expect("sign in succeeds");
    orchestrator.edit_form(|form| *form = filled_form());
    orchestrator
}
