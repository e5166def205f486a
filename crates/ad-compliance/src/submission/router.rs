use std::future::Future;
use std::sync::Arc;

use mime::Mime;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::builder::SubmissionPayload;
use super::classifier::{AnalysisResult, RawAnalysis, ResultClassifier};
use super::domain::{AdImage, Destination, Engine, Selector};
use super::rewrite::RewrittenAd;
use crate::config::EngineConfig;

pub const FIELD_URL: &str = "url";
pub const FIELD_HEADLINE: &str = "headline";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_PRIMARY_TEXT: &str = "primary_text";
pub const FIELD_KEYWORDS: &str = "keywords";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_IMAGES: &str = "images";

/// Logical endpoint names resolved against the configured engine address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointId {
    AnalyzeAd,
    AnalyzeWithGpt,
    AnalyzeWithGemini,
    Unified,
    Rewrite,
}

impl EndpointId {
    /// Fixed routing table. Every destination shares the unified endpoint.
    pub const fn for_selector(selector: Selector) -> Self {
        match selector {
            Selector::Engine(Engine::Fast) => Self::AnalyzeAd,
            Selector::Engine(Engine::Gpt) => Self::AnalyzeWithGpt,
            Selector::Engine(Engine::Gemini) => Self::AnalyzeWithGemini,
            Selector::Destination(_) => Self::Unified,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnalyzeAd => "analyze_ad",
            Self::AnalyzeWithGpt => "analyze_with_gpt",
            Self::AnalyzeWithGemini => "analyze_with_gemini",
            Self::Unified => "unified",
            Self::Rewrite => "rewrite_ad_with_gpt",
        }
    }
}

/// Resolved address for each [`EndpointId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    analyze_ad: Url,
    analyze_with_gpt: Url,
    analyze_with_gemini: Url,
    unified: Url,
    rewrite: Url,
}

impl EndpointTable {
    pub fn from_config(config: &EngineConfig) -> Result<Self, url::ParseError> {
        let base = &config.base_url;
        let paths = &config.endpoints;
        Ok(Self {
            analyze_ad: base.join(paths.analyze_ad.trim_start_matches('/'))?,
            analyze_with_gpt: base.join(paths.analyze_with_gpt.trim_start_matches('/'))?,
            analyze_with_gemini: base.join(paths.analyze_with_gemini.trim_start_matches('/'))?,
            unified: base.join(paths.unified.trim_start_matches('/'))?,
            rewrite: base.join(paths.rewrite.trim_start_matches('/'))?,
        })
    }

    pub fn resolve(&self, id: EndpointId) -> &Url {
        match id {
            EndpointId::AnalyzeAd => &self.analyze_ad,
            EndpointId::AnalyzeWithGpt => &self.analyze_with_gpt,
            EndpointId::AnalyzeWithGemini => &self.analyze_with_gemini,
            EndpointId::Unified => &self.unified,
            EndpointId::Rewrite => &self.rewrite,
        }
    }
}

/// One multipart part value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        content_type: Option<Mime>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: &'static str,
    pub value: PartValue,
}

/// Transport-neutral multipart body. Repeated names are preserved in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.parts.push(FormPart {
            name,
            value: PartValue::Text(value.into()),
        });
        self
    }

    pub fn file(&mut self, name: &'static str, image: &AdImage) -> &mut Self {
        self.parts.push(FormPart {
            name,
            value: PartValue::File {
                file_name: image.file_name.clone(),
                content_type: image.content_type.clone(),
                bytes: image.bytes.clone(),
            },
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }

    /// Text values recorded under `name`, in insertion order.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|part| part.name == name)
            .filter_map(|part| match &part.value {
                PartValue::Text(value) => Some(value.as_str()),
                PartValue::File { .. } => None,
            })
            .collect()
    }

    pub fn file_names(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|part| part.name == name)
            .filter_map(|part| match &part.value {
                PartValue::File { file_name, .. } => Some(file_name.as_str()),
                PartValue::Text(_) => None,
            })
            .collect()
    }
}

/// Raw HTTP outcome handed back by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("invalid request part: {0}")]
    InvalidPart(String),
}

/// External transport collaborator. Timeouts and retries are its concern.
pub trait Transport: Send + Sync {
    fn post(
        &self,
        endpoint: &Url,
        form: MultipartForm,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("{endpoint} returned a malformed body: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("selector {selector} does not match payload destination {payload:?}")]
    SelectorMismatch {
        selector: Selector,
        payload: Option<Destination>,
    },
}

/// Maps selectors to endpoints, posts payloads, and classifies the reply.
///
/// The router never retries and treats any partial or unparsable response as a total
/// failure.
pub struct EngineRouter<T> {
    transport: Arc<T>,
    endpoints: EndpointTable,
    classifier: ResultClassifier,
}

impl<T> EngineRouter<T>
where
    T: Transport,
{
    pub fn new(transport: Arc<T>, endpoints: EndpointTable) -> Self {
        Self {
            transport,
            endpoints,
            classifier: ResultClassifier,
        }
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    pub fn route(&self, selector: Selector) -> &Url {
        self.endpoints.resolve(EndpointId::for_selector(selector))
    }

    pub async fn dispatch(
        &self,
        payload: &SubmissionPayload,
        selector: Selector,
    ) -> Result<AnalysisResult, DispatchError> {
        let form = analysis_form(payload, selector)?;
        let endpoint = EndpointId::for_selector(selector);
        info!(%selector, endpoint = endpoint.as_str(), "dispatching ad for analysis");

        let raw: RawAnalysis = self.post_json(endpoint, form).await?;
        let result = self.classifier.classify(raw);
        debug!(
            endpoint = endpoint.as_str(),
            relevancy = result.relevancy_score,
            compliant = result.compliant,
            "analysis settled"
        );
        Ok(result)
    }

    pub async fn rewrite(&self, payload: &SubmissionPayload) -> Result<RewrittenAd, DispatchError> {
        let form = rewrite_form(payload);
        info!(endpoint = EndpointId::Rewrite.as_str(), "requesting ad rewrite");
        self.post_json(EndpointId::Rewrite, form).await
    }

    async fn post_json<R>(&self, endpoint: EndpointId, form: MultipartForm) -> Result<R, DispatchError>
    where
        R: DeserializeOwned,
    {
        let url = self.endpoints.resolve(endpoint);
        let response = match self.transport.post(url, form).await {
            Ok(response) => response,
            Err(err) => {
                warn!(endpoint = endpoint.as_str(), error = %err, "transport failure");
                return Err(err.into());
            }
        };

        if !response.is_success() {
            warn!(
                endpoint = endpoint.as_str(),
                status = response.status,
                "engine rejected request"
            );
            return Err(DispatchError::Status {
                endpoint: endpoint.as_str(),
                status: response.status,
            });
        }

        serde_json::from_slice(&response.body).map_err(|source| {
            warn!(endpoint = endpoint.as_str(), error = %source, "unparsable engine response");
            DispatchError::Malformed {
                endpoint: endpoint.as_str(),
                source,
            }
        })
    }
}

/// Multipart body for an analysis request. Destinations travel in `source`,
/// never in the URL.
pub fn analysis_form(
    payload: &SubmissionPayload,
    selector: Selector,
) -> Result<MultipartForm, DispatchError> {
    if payload.destination != selector.destination() {
        return Err(DispatchError::SelectorMismatch {
            selector,
            payload: payload.destination,
        });
    }

    let mut form = MultipartForm::new();
    form.text(FIELD_URL, payload.url.as_str());

    if selector.is_multi_field() {
        for headline in &payload.headlines {
            form.text(FIELD_HEADLINE, headline.as_str());
        }
        for description in &payload.descriptions {
            form.text(FIELD_DESCRIPTION, description.as_str());
        }
    } else {
        form.text(FIELD_HEADLINE, first_or_empty(&payload.headlines));
        form.text(FIELD_DESCRIPTION, first_or_empty(&payload.descriptions));
    }

    form.text(FIELD_PRIMARY_TEXT, payload.primary_text.as_str());
    form.text(
        FIELD_KEYWORDS,
        payload.image_description.as_deref().unwrap_or_default(),
    );

    if let Some(destination) = selector.destination() {
        form.text(FIELD_SOURCE, destination.as_str());
    }

    for image in &payload.images {
        form.file(FIELD_IMAGES, image);
    }

    Ok(form)
}

/// Multipart body for the rewrite endpoint: the lead copy only, no images.
pub fn rewrite_form(payload: &SubmissionPayload) -> MultipartForm {
    let mut form = MultipartForm::new();
    form.text(FIELD_URL, payload.url.as_str())
        .text(FIELD_HEADLINE, first_or_empty(&payload.headlines))
        .text(FIELD_DESCRIPTION, first_or_empty(&payload.descriptions))
        .text(FIELD_PRIMARY_TEXT, payload.primary_text.as_str());
    form
}

fn first_or_empty(values: &[String]) -> &str {
    values.first().map(String::as_str).unwrap_or_default()
}
