use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use alloy_primitives::U256;
use tracing::{debug, info};

use delegation_scope_types::{PolicyGroup, QuoteId, Venue};

use crate::{
    clock::Clock,
    config::EngineConfig,
    errors::ExecutionError,
    quote::{min_out_after_slippage, Quote, QuoteParams, QuoteView},
    store::QuoteStore,
};

/// Creates, looks up and retires quotes.
pub struct QuoteManager {
    store: Arc<dyn QuoteStore>,
    clock: Arc<dyn Clock>,
    default_ttl_ms: u64,
    max_slippage_bps: u16,
    seq: AtomicU64,
}

impl QuoteManager {
    pub fn new(store: Arc<dyn QuoteStore>, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            default_ttl_ms: config.quote_ttl_ms,
            max_slippage_bps: config.max_slippage_bps,
            seq: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn QuoteStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn next_id(&self, venue: Venue, now_ms: u64) -> QuoteId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        QuoteId::new(venue, format!("{now_ms:x}-{seq:x}"))
    }

    /// Price the trade, bind its call and store it under a fresh `venue`-prefixed id.
    pub fn create_quote(
        &self,
        venue: Venue,
        source_tag: &str,
        params: QuoteParams,
    ) -> Result<QuoteView, ExecutionError> {
        let invalid = |reason: &str| ExecutionError::InvalidQuote {
            venue,
            source_tag: source_tag.to_string(),
            reason: reason.to_string(),
        };

        if params.slippage_bps > self.max_slippage_bps {
            return Err(invalid(&format!(
                "slippage {} bps exceeds the {} bps limit",
                params.slippage_bps, self.max_slippage_bps
            )));
        }
        if params.call.calldata.len() < 4 {
            return Err(invalid("calldata shorter than a selector"));
        }
        if params.ttl_ms == Some(0) {
            return Err(invalid("ttl must be positive"));
        }

        let (expected_out, min_out) = match params.operation {
            PolicyGroup::Approve => (U256::ZERO, U256::ZERO),
            PolicyGroup::Trading => {
                if params.amount_in.is_zero() {
                    return Err(invalid("amount_in is zero"));
                }
                let expected = params
                    .pricing
                    .expected_out(params.amount_in)
                    .ok_or_else(|| invalid("pricing overflowed or has empty reserves"))?;
                if expected.is_zero() {
                    return Err(invalid("quote yields no output"));
                }
                (expected, min_out_after_slippage(expected, params.slippage_bps))
            }
        };

        let now_ms = self.clock.now_ms();
        let ttl_ms = params.ttl_ms.unwrap_or(self.default_ttl_ms);
        let mut expires_at_ms = now_ms.saturating_add(ttl_ms);
        if let Some(deadline) = params.deadline_ms {
            expires_at_ms = expires_at_ms.min(deadline);
        }

        let id = self.next_id(venue, now_ms);
        let quote = Quote::new(
            id.clone(),
            source_tag.to_string(),
            params,
            expected_out,
            min_out,
            now_ms,
            expires_at_ms,
        );
        let view = quote.view();
        self.store.put(quote);

        info!(
            quote_id = %id,
            %venue,
            source = source_tag,
            operation = %view.operation,
            expires_at_ms,
            "quote created"
        );
        Ok(view)
    }

    /// Lookup by id, routed to the venue's cache. Expired quotes are returned until swept;
    /// check [`QuoteManager::is_expired`].
    pub fn get_quote(&self, id: &QuoteId) -> Option<QuoteView> {
        self.store.get(id).map(|q| q.view())
    }

    pub fn is_expired(&self, quote: &QuoteView) -> bool {
        self.clock.now_ms() >= quote.expires_at_ms
    }

    /// Idempotent removal.
    pub fn delete_quote(&self, id: &QuoteId) -> bool {
        let removed = self.store.delete(id);
        if removed {
            debug!(quote_id = %id, "quote deleted");
        }
        removed
    }

    /// Eager sweep of every expired quote.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.store.sweep(self.clock.now_ms());
        if removed > 0 {
            debug!(removed, "swept expired quotes");
        }
        removed
    }
}
