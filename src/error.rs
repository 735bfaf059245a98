//! Cycle-level errors.
//!
//! Per-slot submission failures are [`crate::relay::SubmissionError`] and
//! never abort a cycle; the errors here do.

use crate::config::{format_report, ConfigViolation};
use crate::relay::PlanningError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum CycleError {
    /// Upstream unreachable or returned a malformed page. Nothing published.
    UpstreamFetch(String),
    /// Chain id, nonce or fee lookup failed before planning.
    SigningContext(String),
    Planning(PlanningError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpstreamFetch(msg) => write!(f, "upstream fetch failed: {}", msg),
            Self::SigningContext(msg) => write!(f, "signing context unavailable: {}", msg),
            Self::Planning(err) => write!(f, "planning failed: {}", err),
        }
    }
}

impl std::error::Error for CycleError {}

impl From<PlanningError> for CycleError {
    fn from(err: PlanningError) -> Self {
        Self::Planning(err)
    }
}

#[derive(Debug, Clone)]
pub enum ConfigError {
    Invalid(Vec<ConfigViolation>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(violations) => f.write_str(&format_report(violations)),
        }
    }
}

impl std::error::Error for ConfigError {}
