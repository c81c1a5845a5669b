//! Cross-cutting error taxonomy shared by every core crate.
//!
//! The kinds below mirror the error design in the platform's architecture
//! notes: each variant carries its own retry/propagation policy, enforced by
//! callers rather than by this type itself (this crate has no I/O).

use thiserror::Error;

/// Error taxonomy shared across the Semptify core runtime.
///
/// Variants map directly onto the documented error-handling design:
/// malformed input is never retried, storage failures are retried by the
/// caller up to a fixed budget, and classifier failures degrade gracefully
/// rather than aborting the intake pipeline.
#[derive(Debug, Error)]
pub enum TenantError {
    /// Malformed payload or missing required field. Never retried.
    #[error("input error: {0}")]
    Input(String),

    /// Access denied by the vault engine.
    #[error("access denied: {0}")]
    Auth(String),

    /// Referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient cloud storage failure. Caller should retry with backoff.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The classifier returned an error or timed out. Non-fatal: callers
    /// should continue the pipeline with `doc_type = "unknown"`.
    #[error("classifier failure: {0}")]
    ClassifierFailure(String),

    /// Recomputed content hash did not match the recorded hash.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// Missing credentials or invalid schema detected at startup. Fatal.
    #[error("fatal misconfiguration: {0}")]
    FatalMisconfiguration(String),
}

impl TenantError {
    /// Whether this error class is safe to retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TenantError::StorageUnavailable(_))
    }
}
