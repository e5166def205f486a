//! Ad submission orchestration: editable form state, access gating, payload building,
//! engine routing, and verdict classification.
//!
//! Only [`AnalysisResult`] and its [`ResultReport`] are meant for presentation code; the
//! raw engine payload never leaves this module.

pub mod auth;
pub mod builder;
pub mod classifier;
pub mod domain;
pub mod fields;
pub mod orchestrator;
pub mod rewrite;
pub mod router;
pub mod transport;

#[cfg(test)]
mod tests;

pub use auth::{
    access_state_for, AccessState, AllowList, AuthGate, AuthorizationError, GateState, Identity,
    IdentityError, IdentityProvider,
};
pub use builder::{SubmissionBuilder, SubmissionPayload, ValidationError};
pub use classifier::{
    AnalysisResult, CostLine, ImageAdvisory, RawAnalysis, ResultClassifier, ResultReport,
    ScorePill, ScoreTier, TokenUsage,
};
pub use domain::{AdImage, Destination, Engine, FieldKind, FormState, Selector, UnknownSelector};
pub use fields::{FieldArray, FieldError, MAX_FIELDS};
pub use orchestrator::{AnalysisRecord, DispatchOutcome, SubmissionError, SubmissionOrchestrator};
pub use rewrite::RewrittenAd;
pub use router::{
    DispatchError, EndpointId, EndpointTable, EngineRouter, MultipartForm, PartValue, Transport,
    TransportError, TransportResponse,
};
pub use transport::HttpTransport;
