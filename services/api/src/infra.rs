use ad_compliance::config::{ConfigError, EngineConfig};
use ad_compliance::error::AppError;
use ad_compliance::submission::{
    AdImage, AllowList, EndpointTable, EngineRouter, HttpTransport, Identity, IdentityError,
    IdentityProvider, SubmissionOrchestrator,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::watch;

pub(crate) type Session = SubmissionOrchestrator<HttpTransport, StaticIdentityProvider>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engines: Arc<EngineRouter<HttpTransport>>,
    pub(crate) allow_list: Arc<AllowList>,
}

/// Identity collaborator for non-interactive surfaces: the operator email comes from a
/// flag or request header instead of an interactive sign-in.
pub(crate) struct StaticIdentityProvider {
    email: Option<String>,
    sender: watch::Sender<Option<Identity>>,
}

impl StaticIdentityProvider {
    pub(crate) fn new(email: Option<String>) -> Self {
        let email = email
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let (sender, _) = watch::channel(None);
        Self { email, sender }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.sender.subscribe()
    }

    async fn sign_in(&self) -> Result<Identity, IdentityError> {
        let email = self.email.as_deref().ok_or_else(|| {
            IdentityError::Unavailable("no operator email was supplied".to_string())
        })?;
        let identity = Identity::new(format!("operator:{email}"), email);
        self.sender.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sender.send_replace(None);
        Ok(())
    }
}

pub(crate) fn build_engine_router(
    config: &EngineConfig,
) -> Result<EngineRouter<HttpTransport>, AppError> {
    let endpoints =
        EndpointTable::from_config(config).map_err(|source| ConfigError::InvalidEngineUrl {
            value: config.base_url.to_string(),
            source,
        })?;
    let transport = HttpTransport::new(config.request_timeout)?;
    Ok(EngineRouter::new(Arc::new(transport), endpoints))
}

/// Open a session and, when an email is present, sign that operator in. Without an
/// email the gate stays pending and submissions fail as not signed in.
pub(crate) async fn open_session(
    engines: Arc<EngineRouter<HttpTransport>>,
    allow_list: Arc<AllowList>,
    email: Option<String>,
) -> Result<Session, AppError> {
    let identity = StaticIdentityProvider::new(email);
    let signed_in = identity.email.is_some();
    let session = SubmissionOrchestrator::new(engines, Arc::new(identity), allow_list);
    if signed_in {
        session.sign_in().await?;
    }
    Ok(session)
}

pub(crate) fn load_image(path: &Path) -> Result<AdImage, AppError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let image = AdImage::new(file_name, bytes);
    Ok(match mime_guess::from_path(path).first() {
        Some(content_type) => image.with_content_type(content_type),
        None => image,
    })
}
