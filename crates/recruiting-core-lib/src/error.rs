//! Typed error kinds shared by every component in this crate.
//!
//! No component crosses its boundary with a panic or a bare `anyhow::Error`:
//! public operations return `Result<T, CoreError>`, and the facade in
//! [`crate::engine`] is the only place that turns an `Err` into the
//! `{success: false, error}` envelope callers see.

use thiserror::Error;

/// The six error kinds named by the error-handling design.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A referenced entity exists but in a different tenant. Callers outside
    /// the core must see this as [`CoreError::NotFound`] to avoid leaking
    /// cross-tenant existence; components that need the distinction
    /// internally (audit, reconciliation) can match on this variant directly.
    #[error("not found: {0}")]
    TenantMismatch(String),

    /// An external deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    /// An external store or service was unreachable.
    #[error("transport error: {0}")]
    TransportError(String),

    /// A programmer error: an operation was invoked out of its required order
    /// (e.g. `assign_one` before `cluster_candidates`). Never recovered from.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Malformed caller input.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Collapse [`CoreError::TenantMismatch`] into [`CoreError::NotFound`] for
    /// external callers, per the no-information-leak policy in §7.
    pub fn externalize(self) -> CoreError {
        match self {
            CoreError::TenantMismatch(msg) => CoreError::NotFound(msg),
            other => other,
        }
    }

    /// Short machine-readable kind name, used in the envelope and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::TenantMismatch(_) => "tenant_mismatch",
            CoreError::Timeout(_) => "timeout",
            CoreError::TransportError(_) => "transport_error",
            CoreError::InvariantViolation(_) => "invariant_violation",
            CoreError::ValidationError(_) => "validation_error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
