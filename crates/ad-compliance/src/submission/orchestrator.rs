use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::auth::{
    AccessState, AllowList, AuthGate, AuthorizationError, GateState, Identity, IdentityError,
    IdentityProvider,
};
use super::builder::{SubmissionBuilder, SubmissionPayload, ValidationError};
use super::classifier::AnalysisResult;
use super::domain::{AdImage, FieldKind, FormState, Selector};
use super::fields::FieldError;
use super::rewrite::RewrittenAd;
use super::router::{DispatchError, EngineRouter, Transport};

/// Analysis accepted into the session, tagged with the generation it was issued under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub result: AnalysisResult,
    #[serde(serialize_with = "serialize_selector")]
    pub selector: Selector,
    pub generation: u64,
    pub received_at: DateTime<Utc>,
}

fn serialize_selector<S>(selector: &Selector, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(selector)
}

/// How a settled dispatch was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome<T> {
    Accepted(T),
    /// The session was reset while the request was in flight; the response was dropped.
    Discarded { generation: u64 },
}

impl<T> DispatchOutcome<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted(value) => Some(value),
            Self::Discarded { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in flight")]
    InFlight,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

struct Session {
    form: FormState,
    gate: AuthGate,
    last_result: Option<AnalysisRecord>,
    last_rewrite: Option<RewrittenAd>,
    generation: u64,
}

/// Clears the in-flight flag when the dispatch settles, including on early return.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One operator session: form state, access gate, dispatch discipline, and the last
/// accepted verdict.
///
/// At most one request (analysis or rewrite) is in flight at a time. A second gesture
/// while one is pending fails with [`SubmissionError::InFlight`] and issues no network
/// call. A failed dispatch leaves the previous result untouched.
pub struct SubmissionOrchestrator<T, P> {
    router: Arc<EngineRouter<T>>,
    identity: Arc<P>,
    session: Mutex<Session>,
    in_flight: AtomicBool,
}

impl<T, P> SubmissionOrchestrator<T, P>
where
    T: Transport + 'static,
    P: IdentityProvider + 'static,
{
    pub fn new(router: Arc<EngineRouter<T>>, identity: Arc<P>, allow_list: Arc<AllowList>) -> Self {
        Self {
            router,
            identity,
            session: Mutex::new(Session {
                form: FormState::default(),
                gate: AuthGate::new(allow_list),
                last_result: None,
                last_rewrite: None,
                generation: 0,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn gate_state(&self) -> GateState {
        self.session().gate.state().clone()
    }

    pub fn access_state(&self) -> AccessState {
        self.session().gate.access_state()
    }

    pub fn is_submission_allowed(&self) -> bool {
        self.session().gate.is_submission_allowed()
    }

    /// Re-evaluate the gate for a new identity. A newly denied subject is signed out
    /// through the identity collaborator; failures there are logged, never retried.
    pub async fn apply_identity(&self, identity: Option<Identity>) -> GateState {
        let state = self.session().gate.observe(identity.as_ref()).clone();

        match &state {
            GateState::Authorized { email } => info!(%email, "operator authorized"),
            GateState::Unauthenticated | GateState::Pending => info!("operator signed out"),
            GateState::Denied { email } if identity.is_some() => {
                warn!(%email, "operator not on allow-list; signing out");
                if let Err(err) = self.identity.sign_out().await {
                    warn!(error = %err, "sign-out after denial failed");
                }
            }
            GateState::Denied { email } => debug!(%email, "denied operator signed out"),
        }

        state
    }

    /// Follow identity changes pushed by the provider until it stops publishing.
    /// Dropping the returned future unsubscribes.
    pub async fn follow_identity(&self) {
        let mut updates = self.identity.subscribe();
        loop {
            let current = updates.borrow_and_update().clone();
            self.apply_identity(current).await;
            if updates.changed().await.is_err() {
                debug!("identity stream closed");
                break;
            }
        }
    }

    pub async fn sign_in(&self) -> Result<GateState, IdentityError> {
        match self.identity.sign_in().await {
            Ok(identity) => Ok(self.apply_identity(Some(identity)).await),
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                Err(err)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<GateState, IdentityError> {
        match self.identity.sign_out().await {
            Ok(()) => Ok(self.apply_identity(None).await),
            Err(err) => {
                warn!(error = %err, "sign-out failed");
                Err(err)
            }
        }
    }

    pub fn form(&self) -> FormState {
        self.session().form.clone()
    }

    /// Edit the form in place. Keep the closure short; it runs under the session lock.
    pub fn edit_form<R>(&self, edit: impl FnOnce(&mut FormState) -> R) -> R {
        edit(&mut self.session().form)
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.session().form.url = url.into();
    }

    pub fn set_primary_text(&self, primary_text: impl Into<String>) {
        self.session().form.primary_text = primary_text.into();
    }

    pub fn set_keywords(&self, keywords: impl Into<String>) {
        self.session().form.keywords = keywords.into();
    }

    pub fn set_images(&self, images: Vec<AdImage>) {
        self.session().form.images = images;
    }

    pub fn add_entry(&self, kind: FieldKind) -> bool {
        self.session().form.field_mut(kind).add_entry()
    }

    pub fn remove_entry(&self, kind: FieldKind, index: usize) -> Result<String, FieldError> {
        self.session().form.field_mut(kind).remove_entry(index)
    }

    pub fn set_entry(
        &self,
        kind: FieldKind,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), FieldError> {
        self.session().form.field_mut(kind).set_entry(index, value)
    }

    /// Clear the form and results and start a new generation. Responses to requests
    /// issued before the reset are discarded when they arrive.
    pub fn reset(&self) {
        let mut session = self.session();
        session.form = FormState::default();
        session.last_result = None;
        session.last_rewrite = None;
        session.generation += 1;
        debug!(generation = session.generation, "session reset");
    }

    pub fn is_dispatching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_result(&self) -> Option<AnalysisRecord> {
        self.session().last_result.clone()
    }

    pub fn last_rewrite(&self) -> Option<RewrittenAd> {
        self.session().last_rewrite.clone()
    }

    pub fn generation(&self) -> u64 {
        self.session().generation
    }

    /// Analyze the current form with the given selector.
    pub async fn submit(
        &self,
        selector: Selector,
    ) -> Result<DispatchOutcome<AnalysisRecord>, SubmissionError> {
        let _flight = self.begin_flight()?;
        let (payload, generation) = {
            let mut session = self.session();
            let payload = Self::prepare(&session, selector)?;
            session.last_rewrite = None;
            (payload, session.generation)
        };

        let result = self.router.dispatch(&payload, selector).await?;

        let mut session = self.session();
        if session.generation != generation {
            debug!(generation, current = session.generation, "discarding stale analysis");
            return Ok(DispatchOutcome::Discarded { generation });
        }

        let record = AnalysisRecord {
            result,
            selector,
            generation,
            received_at: Utc::now(),
        };
        session.last_result = Some(record.clone());
        Ok(DispatchOutcome::Accepted(record))
    }

    /// Ask the rewrite engine for improved copy based on the current form.
    pub async fn rewrite(&self) -> Result<DispatchOutcome<RewrittenAd>, SubmissionError> {
        let _flight = self.begin_flight()?;
        let (payload, generation) = {
            let session = self.session();
            (Self::prepare(&session, Selector::default())?, session.generation)
        };

        let rewritten = self.router.rewrite(&payload).await?;

        let mut session = self.session();
        if session.generation != generation {
            debug!(generation, current = session.generation, "discarding stale rewrite");
            return Ok(DispatchOutcome::Discarded { generation });
        }
        session.last_rewrite = Some(rewritten.clone());
        Ok(DispatchOutcome::Accepted(rewritten))
    }

    fn prepare(session: &Session, selector: Selector) -> Result<SubmissionPayload, SubmissionError> {
        session.gate.ensure_authorized()?;
        Ok(SubmissionBuilder::build(
            &session.form,
            selector.destination(),
        )?)
    }

    fn begin_flight(&self) -> Result<FlightGuard<'_>, SubmissionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmissionError::InFlight)?;
        Ok(FlightGuard {
            flag: &self.in_flight,
        })
    }
}
