//! Scripted quote source.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use delegation_scope_types::Venue;

use crate::{
    errors::SourceError,
    quote::QuoteParams,
    router::{QuoteRequest, QuoteSource},
};

/// Source that always answers with the same outcome.
///
/// Used to exercise routing without a venue client.
pub struct StaticSource {
    tag: String,
    venue: Venue,
    outcome: Result<QuoteParams, SourceError>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(
        tag: impl Into<String>,
        venue: Venue,
        outcome: Result<QuoteParams, SourceError>,
    ) -> Self {
        Self {
            tag: tag.into(),
            venue,
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for StaticSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn venue(&self) -> Venue {
        self.venue
    }

    async fn fetch_quote(&self, _request: &QuoteRequest) -> Result<QuoteParams, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
