//! Process-wide quote storage with per-venue caches.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use delegation_scope_types::{QuoteId, Venue};

use crate::{clock::Clock, quote::Quote};

/// Injectable quote store.
///
/// A quote is either live (visible to `get`) or claimed by an in-flight redemption.
/// `claim` must be atomic per id: of two concurrent claims for the same id, at most one
/// returns the quote. `sweep` drops expired quotes in both states.
pub trait QuoteStore: Send + Sync {
    fn put(&self, quote: Quote);
    fn get(&self, id: &QuoteId) -> Option<Quote>;
    /// Move a live quote to the claimed set and return it.
    fn claim(&self, id: &QuoteId) -> Option<Quote>;
    /// Remove a claimed quote and return it.
    fn unclaim(&self, id: &QuoteId) -> Option<Quote>;
    /// Idempotent removal of a live quote; returns whether anything was removed.
    fn delete(&self, id: &QuoteId) -> bool;
    /// Drop every live or claimed quote expired at `now_ms`; returns how many were dropped.
    fn sweep(&self, now_ms: u64) -> usize;
    /// Live quotes.
    fn len(&self) -> usize;
    fn claimed_len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store, one concurrent map per venue keyed by local id.
#[derive(Debug)]
pub struct MemoryQuoteStore {
    caches: [DashMap<String, Quote>; Venue::ALL.len()],
    claimed: DashMap<QuoteId, Quote>,
}

impl Default for MemoryQuoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self {
            caches: std::array::from_fn(|_| DashMap::new()),
            claimed: DashMap::new(),
        }
    }

    fn cache(&self, venue: Venue) -> &DashMap<String, Quote> {
        &self.caches[venue.slot()]
    }

    pub fn len_for(&self, venue: Venue) -> usize {
        self.cache(venue).len()
    }
}

fn retain_unexpired<K: Eq + std::hash::Hash>(map: &DashMap<K, Quote>, now_ms: u64) -> usize {
    let before = map.len();
    map.retain(|_, quote| !quote.is_expired_at(now_ms));
    before.saturating_sub(map.len())
}

impl QuoteStore for MemoryQuoteStore {
    fn put(&self, quote: Quote) {
        let key = quote.id().local_id().to_string();
        self.cache(quote.venue()).insert(key, quote);
    }

    fn get(&self, id: &QuoteId) -> Option<Quote> {
        self.cache(id.venue())
            .get(id.local_id())
            .map(|entry| entry.value().clone())
    }

    fn claim(&self, id: &QuoteId) -> Option<Quote> {
        let (_, quote) = self.cache(id.venue()).remove(id.local_id())?;
        self.claimed.insert(id.clone(), quote.clone());
        Some(quote)
    }

    fn unclaim(&self, id: &QuoteId) -> Option<Quote> {
        self.claimed.remove(id).map(|(_, quote)| quote)
    }

    fn delete(&self, id: &QuoteId) -> bool {
        self.cache(id.venue()).remove(id.local_id()).is_some()
    }

    fn sweep(&self, now_ms: u64) -> usize {
        let live: usize = self
            .caches
            .iter()
            .map(|cache| retain_unexpired(cache, now_ms))
            .sum();
        live + retain_unexpired(&self.claimed, now_ms)
    }

    fn len(&self) -> usize {
        self.caches.iter().map(DashMap::len).sum()
    }

    fn claimed_len(&self) -> usize {
        self.claimed.len()
    }
}

/// Below this `tokio::time::interval` would spin or panic.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically drop expired quotes, claimed ones included. Abort the handle to stop.
///
/// `every` is clamped to at least one millisecond.
pub fn spawn_sweeper(
    store: Arc<dyn QuoteStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(MIN_SWEEP_INTERVAL));
        loop {
            ticker.tick().await;
            let removed = store.sweep(clock.now_ms());
            if removed > 0 {
                debug!(removed, "swept expired quotes");
            }
        }
    })
}
