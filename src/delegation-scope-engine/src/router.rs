//! Primary/fallback quote routing.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use delegation_scope_types::{PolicyGroup, Venue};

use crate::{
    errors::{ExecutionError, SourceError},
    manager::QuoteManager,
    quote::{QuoteParams, QuoteView},
};

/// Logical quote request, identical for every source tried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteRequest {
    pub operation: PolicyGroup,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub slippage_bps: u16,
    /// Account that will execute the call (the delegator).
    pub taker: Address,
}

/// A venue-specific quote client. Transport retries, if any, live inside the source.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn tag(&self) -> &str;

    fn venue(&self) -> Venue;

    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<QuoteParams, SourceError>;
}

/// Router output handed to calling tools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteResult {
    pub quote: QuoteView,
    pub source_tag: String,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

enum RouteState {
    TryPrimary,
    TryFallback {
        source: Arc<dyn QuoteSource>,
        primary_reason: String,
    },
}

/// Tries the primary source, then the fallback on any primary failure.
pub struct AggregatorRouter {
    manager: Arc<QuoteManager>,
    primary: Arc<dyn QuoteSource>,
    fallback: Option<Arc<dyn QuoteSource>>,
}

impl AggregatorRouter {
    pub fn new(manager: Arc<QuoteManager>, primary: Arc<dyn QuoteSource>) -> Self {
        Self {
            manager,
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn QuoteSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub async fn route(&self, request: &QuoteRequest) -> Result<QuoteResult, ExecutionError> {
        let mut state = RouteState::TryPrimary;
        loop {
            state = match state {
                RouteState::TryPrimary => {
                    let primary = self.primary.as_ref();
                    let reason = match self.attempt(primary, request).await {
                        Ok(quote) => return Ok(self.finish(primary, quote, None)),
                        Err(reason) => reason,
                    };
                    warn!(source = primary.tag(), %reason, "primary quote source failed");
                    match &self.fallback {
                        Some(fallback) => RouteState::TryFallback {
                            source: Arc::clone(fallback),
                            primary_reason: reason,
                        },
                        None => {
                            return Err(ExecutionError::SourceUnavailable {
                                source_tag: primary.tag().to_string(),
                                reason,
                            })
                        }
                    }
                }
                RouteState::TryFallback {
                    source,
                    primary_reason,
                } => {
                    return match self.attempt(source.as_ref(), request).await {
                        Ok(quote) => {
                            info!(
                                source = source.tag(),
                                primary = self.primary.tag(),
                                %primary_reason,
                                "fallback quote source used"
                            );
                            Ok(self.finish(source.as_ref(), quote, Some(primary_reason)))
                        }
                        Err(fallback_reason) => {
                            warn!(
                                primary = self.primary.tag(),
                                fallback = source.tag(),
                                %primary_reason,
                                %fallback_reason,
                                "all quote sources failed"
                            );
                            Err(ExecutionError::AllSourcesFailed {
                                primary: self.primary.tag().to_string(),
                                primary_reason,
                                fallback: source.tag().to_string(),
                                fallback_reason,
                            })
                        }
                    };
                }
            };
        }
    }

    /// Fetch and store a quote; any failure, including an unusable quote or one that does not
    /// answer the request, is a reason string.
    async fn attempt(
        &self,
        source: &dyn QuoteSource,
        request: &QuoteRequest,
    ) -> Result<QuoteView, String> {
        let params = source
            .fetch_quote(request)
            .await
            .map_err(|e| e.to_string())?;
        if let Some(reason) = request_mismatch(request, &params) {
            return Err(reason);
        }
        self.manager
            .create_quote(source.venue(), source.tag(), params)
            .map_err(|e| e.to_string())
    }

    fn finish(
        &self,
        source: &dyn QuoteSource,
        quote: QuoteView,
        fallback_reason: Option<String>,
    ) -> QuoteResult {
        QuoteResult {
            quote,
            source_tag: source.tag().to_string(),
            fallback_used: fallback_reason.is_some(),
            fallback_reason,
        }
    }
}

/// Why `params` does not answer `request`, if it doesn't. A looser slippage than requested is a
/// mismatch; a tighter one is not.
fn request_mismatch(request: &QuoteRequest, params: &QuoteParams) -> Option<String> {
    if params.operation != request.operation {
        return Some(format!(
            "source returned a {} quote for a {} request",
            params.operation, request.operation
        ));
    }
    if params.token_in != request.token_in || params.token_out != request.token_out {
        return Some(format!(
            "source returned a {} -> {} quote for a {} -> {} request",
            params.token_in, params.token_out, request.token_in, request.token_out
        ));
    }
    if params.amount_in != request.amount_in {
        return Some(format!(
            "source quoted amount_in {} for a request of {}",
            params.amount_in, request.amount_in
        ));
    }
    if params.slippage_bps > request.slippage_bps {
        return Some(format!(
            "slippage {} bps exceeds the requested {} bps",
            params.slippage_bps, request.slippage_bps
        ));
    }
    None
}
