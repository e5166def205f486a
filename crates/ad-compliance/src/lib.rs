pub mod config;
pub mod error;
pub mod submission;
pub mod telemetry;
