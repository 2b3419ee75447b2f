use alloy_primitives::Address;
use thiserror::Error;

/// Errors raised while building or selecting delegation terms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Malformed policy input. Always a caller bug, never retried.
    #[error("encoding violation: {0}")]
    EncodingViolation(String),

    /// The delegation carries no caveat for the group-selection enforcer.
    #[error("delegation has no caveat for group-selection enforcer {enforcer}")]
    EnforcerMismatch { enforcer: Address },

    #[error("signing failed: {0}")]
    Signing(String),
}
