use alloy_primitives::{Address, FixedBytes};
use thiserror::Error;

use delegation_scope_encoder::EncodeError;
use delegation_scope_types::{PolicyGroup, QuoteId, Venue};

/// Errors while decoding terms, selections or calldata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input truncated")]
    Truncated,
    #[error("{what} terms are {len} bytes, not a multiple of {width}")]
    BadLength {
        what: &'static str,
        len: usize,
        width: usize,
    },
    #[error("abi decode failed: {0}")]
    Abi(String),
}

/// Pre-flight evaluation failures of a selected group against a bound call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("terms have no group at index {0}")]
    UnknownGroup(usize),
    #[error("group {group} has {actual} caveats, expected {expected}")]
    GroupShape {
        group: PolicyGroup,
        expected: usize,
        actual: usize,
    },
    #[error("enforcer {0} is not understood off-chain")]
    UnsupportedCaveat(Address),
    #[error("selector {0} is not in the allowed methods")]
    MethodNotAllowed(FixedBytes<4>),
    #[error("target {0} is not in the allowed targets")]
    TargetNotAllowed(Address),
    #[error("malformed call: {0}")]
    MalformedCall(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failure reported by a single quote source.
///
/// `Display` is the bare reason so it can be carried verbatim as a fallback reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("no liquidity")]
    NoLiquidity,
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Rejected(String),
}

/// Errors surfaced by the quote lifecycle, binder and router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Malformed policy input. Fatal, never retried.
    #[error("encoding violation: {0}")]
    EncodingViolation(String),

    #[error("quote {id} not found on {venue}: expired, already executed or never issued", venue = .id.venue())]
    QuoteNotFound { id: QuoteId },

    #[error("quote {id} expired at {expires_at_ms} (now {now_ms}); request a new quote")]
    QuoteExpired {
        id: QuoteId,
        expires_at_ms: u64,
        now_ms: u64,
    },

    /// The delegation does not carry the group-selection caveat. Configuration or version
    /// mismatch, never retried.
    #[error("delegation has no caveat for group-selection enforcer {enforcer}")]
    EnforcerMismatch { enforcer: Address },

    #[error("quote source `{source_tag}` failed: {reason}")]
    SourceUnavailable { source_tag: String, reason: String },

    #[error("all quote sources failed: `{primary}`: {primary_reason}; `{fallback}`: {fallback_reason}")]
    AllSourcesFailed {
        primary: String,
        primary_reason: String,
        fallback: String,
        fallback_reason: String,
    },

    #[error("invalid quote from `{source_tag}` on {venue}: {reason}")]
    InvalidQuote {
        venue: Venue,
        source_tag: String,
        reason: String,
    },

    #[error("quote {id} does not satisfy the {group} group: {cause}")]
    PolicyViolation {
        id: QuoteId,
        group: PolicyGroup,
        #[source]
        cause: ValidationError,
    },

    #[error("quote {id} approves spender {spender}, which is not allow-listed")]
    SpenderNotAllowed { id: QuoteId, spender: Address },

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<EncodeError> for ExecutionError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::EnforcerMismatch { enforcer } => {
                ExecutionError::EnforcerMismatch { enforcer }
            }
            EncodeError::EncodingViolation(msg) => ExecutionError::EncodingViolation(msg),
            EncodeError::Signing(msg) => ExecutionError::EncodingViolation(msg),
        }
    }
}
