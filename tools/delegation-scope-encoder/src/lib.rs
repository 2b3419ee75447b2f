//! Off-chain encoding for delegation-scoped execution.
//!
//! Builds the signable logical-OR terms for the canonical (approve, trading) policy and the
//! unsigned group-selection args that are filled in at execution time.

pub mod encoder;
pub mod errors;
pub mod interfaces;
pub mod types;


pub use delegation_scope_types::{Caveat, CaveatGroup, PolicyGroup, Selector, APPROVE_SELECTOR};
pub use encoder::{
    assemble_terms, build_approve_group, build_base_delegation_caveat, build_group,
    build_trading_group, delegation_digest, delegation_hash, encode_selection, encode_selectors,
    encode_targets, parse_selector, parse_target, set_selection, sign_delegation,
};
pub use errors::EncodeError;
pub use types::{
    CaveatTerms, Delegation, DelegationDomain, EnforcerSet, Selection, SignedTerms, ROOT_AUTHORITY,
};
