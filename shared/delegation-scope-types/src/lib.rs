//! Shared types for caveat groups, policy groups and venue-routed quote ids.
//!
//! Kept `no_std` so the same definitions can back both the encoder tooling and any
//! constrained verifier that needs to agree on group ordering.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod caveats;
pub mod quote_id;

pub use caveats::{Caveat, CaveatGroup, PolicyGroup, Selector, APPROVE_SELECTOR};
pub use quote_id::{QuoteId, QuoteIdError, Venue};
