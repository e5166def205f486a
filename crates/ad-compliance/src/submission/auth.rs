use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Signed-in subject as reported by the identity collaborator. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub email: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
        }
    }
}

/// Static set of operator emails allowed to submit. Matching ignores case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    emails: BTreeSet<String>,
}

impl AllowList {
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let emails = iter
            .into_iter()
            .map(|email| normalize_email(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();
        Self { emails }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Three-state view of who is at the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Unauthenticated,
    Unauthorized,
    Authorized,
}

impl AccessState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Signed out",
            Self::Unauthorized => "Not authorized",
            Self::Authorized => "Authorized",
        }
    }
}

/// Derive the access state from an identity and the allow-list.
pub fn access_state_for(identity: Option<&Identity>, allow_list: &AllowList) -> AccessState {
    match identity {
        None => AccessState::Unauthenticated,
        Some(identity) if allow_list.contains(&identity.email) => AccessState::Authorized,
        Some(_) => AccessState::Unauthorized,
    }
}

/// Gate lifecycle. `Pending` holds until the first identity observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Unauthenticated,
    Authorized { email: String },
    Denied { email: String },
}

impl GateState {
    pub fn access_state(&self) -> AccessState {
        match self {
            Self::Pending | Self::Unauthenticated => AccessState::Unauthenticated,
            Self::Authorized { .. } => AccessState::Authorized,
            Self::Denied { .. } => AccessState::Unauthorized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("sign in before submitting ads")]
    NotSignedIn,
    #[error("{email} is not authorized to submit ads; sign in with an approved account")]
    Denied { email: String },
}

/// Tracks the current identity against the allow-list.
#[derive(Debug, Clone)]
pub struct AuthGate {
    allow_list: Arc<AllowList>,
    state: GateState,
}

impl AuthGate {
    pub fn new(allow_list: Arc<AllowList>) -> Self {
        Self {
            allow_list,
            state: GateState::Pending,
        }
    }

    /// Apply an identity change and return the resulting state. Callers must sign the
    /// subject out when a present identity yields [`GateState::Denied`].
    ///
    /// A denial only ends with a fresh identity; the absent identity that follows the
    /// forced sign-out leaves it in place.
    pub fn observe(&mut self, identity: Option<&Identity>) -> &GateState {
        if identity.is_none() && matches!(self.state, GateState::Denied { .. }) {
            return &self.state;
        }
        self.state = match access_state_for(identity, &self.allow_list) {
            AccessState::Unauthenticated => GateState::Unauthenticated,
            AccessState::Authorized => GateState::Authorized {
                email: identity.map(|id| id.email.clone()).unwrap_or_default(),
            },
            AccessState::Unauthorized => GateState::Denied {
                email: identity.map(|id| id.email.clone()).unwrap_or_default(),
            },
        };
        &self.state
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn access_state(&self) -> AccessState {
        self.state.access_state()
    }

    pub fn is_submission_allowed(&self) -> bool {
        matches!(self.state, GateState::Authorized { .. })
    }

    pub fn ensure_authorized(&self) -> Result<(), AuthorizationError> {
        match &self.state {
            GateState::Authorized { .. } => Ok(()),
            GateState::Denied { email } => Err(AuthorizationError::Denied {
                email: email.clone(),
            }),
            GateState::Pending | GateState::Unauthenticated => {
                Err(AuthorizationError::NotSignedIn)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("sign-in was cancelled")]
    Cancelled,
}

/// External authentication collaborator.
///
/// Identity changes are pushed through [`IdentityProvider::subscribe`]; dropping the
/// receiver unsubscribes.
pub trait IdentityProvider: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    fn sign_in(&self) -> impl Future<Output = Result<Identity, IdentityError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;
}
