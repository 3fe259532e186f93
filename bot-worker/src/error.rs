//! Error types for worker orchestration.

use std::fmt;

/// Universal error type that abstracts substrate-specific failures into
/// common variants. Both orchestrator implementations map their native
/// errors to these, so the lifecycle layer never sees the substrate.
#[derive(Debug)]
pub enum Error {
    /// The container runtime or process table is unreachable or refused the
    /// request. Typically transient; the meeting fails at the spawn stage.
    SubstrateUnavailable(String),

    /// The substrate refused to admit another worker (host resources, pid
    /// limits, runtime quotas).
    QuotaExceeded(String),

    /// The configured worker image does not exist. Container substrate only;
    /// the process substrate never produces it.
    BadImage(String),

    /// The referenced worker is unknown to the substrate.
    NotFound(String),

    /// Catch-all for substrate errors that fit no other variant.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SubstrateUnavailable(msg) => write!(f, "Substrate unavailable: {}", msg),
            Error::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            Error::BadImage(msg) => write!(f, "Bad worker image: {}", msg),
            Error::NotFound(msg) => write!(f, "Worker not found: {}", msg),
            Error::Other(err) => write!(f, "Other error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
