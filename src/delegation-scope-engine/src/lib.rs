//! Quote-bound execution for delegation-scoped session keys.
//!
//! A quote binds an off-chain computed trade to exact calldata and value. The binder turns a
//! live quote plus a signed delegation into a call descriptor, choosing the caveat group
//! through the unsigned selection args, and guarantees each quote is bound at most once.

pub mod binder;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod evaluator;
pub mod manager;
pub mod quote;
pub mod router;
pub mod sources;
pub mod store;


pub use binder::{ExecutionBinder, ExecutionDescriptor};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use errors::{DecodeError, ExecutionError, SourceError, ValidationError};
pub use manager::QuoteManager;
pub use quote::{BoundCall, Pricing, Quote, QuoteParams, QuoteView};
pub use router::{AggregatorRouter, QuoteRequest, QuoteResult, QuoteSource};
pub use sources::StaticSource;
pub use store::{spawn_sweeper, MemoryQuoteStore, QuoteStore};

pub use delegation_scope_types::{PolicyGroup, QuoteId, QuoteIdError, Venue};
