//! Binds a live quote to a delegation for redemption.
//!
//! Flow per call:
//! - claim the quote (atomic move out of the live set), so a second bind for the same id
//!   sees `QuoteNotFound`;
//! - reject and drop it if expired;
//! - pick the policy group from the quote's operation and, if enabled, evaluate that group's
//!   caveats against the bound call;
//! - write the selection into the delegation's unsigned args.
//!
//! The selection args are not covered by the signature and give no replay protection on
//! their own. At-most-once execution rests on the claim. Claims live in the store and
//! expire with the quote, so an abandoned claim is collected by the TTL sweep.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use tracing::{info, warn};

use delegation_scope_encoder::{interfaces::IERC20, set_selection, Delegation, EnforcerSet};
use delegation_scope_types::{PolicyGroup, QuoteId};

use crate::{
    clock::Clock,
    config::EngineConfig,
    decoder::decode_groups,
    errors::{ExecutionError, ValidationError},
    evaluator::evaluate_group,
    manager::QuoteManager,
    quote::Quote,
    store::QuoteStore,
};

/// Everything the external redemption step needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionDescriptor {
    pub quote_id: QuoteId,
    pub group: PolicyGroup,
    pub target: Address,
    pub value: U256,
    pub calldata: Bytes,
    pub prepared_delegation: Delegation,
}

pub struct ExecutionBinder {
    store: Arc<dyn QuoteStore>,
    clock: Arc<dyn Clock>,
    enforcers: EnforcerSet,
    approved_spenders: Vec<Address>,
    preflight: bool,
}

impl ExecutionBinder {
    pub fn new(manager: &QuoteManager, config: &EngineConfig) -> Self {
        Self {
            store: Arc::clone(manager.store()),
            clock: Arc::clone(manager.clock()),
            enforcers: config.enforcers,
            approved_spenders: config.approved_spenders.clone(),
            preflight: config.preflight,
        }
    }

    /// Claim `quote_id` and prepare `delegation` to execute it.
    ///
    /// On any error after the claim other than expiry the quote goes back into the store
    /// and `delegation` is left untouched.
    pub fn bind_for_execution(
        &self,
        quote_id: &QuoteId,
        delegation: &mut Delegation,
    ) -> Result<ExecutionDescriptor, ExecutionError> {
        let quote = self
            .store
            .claim(quote_id)
            .ok_or_else(|| ExecutionError::QuoteNotFound {
                id: quote_id.clone(),
            })?;

        let now_ms = self.clock.now_ms();
        if quote.is_expired_at(now_ms) {
            self.store.unclaim(quote_id);
            warn!(
                quote_id = %quote_id,
                expires_at_ms = quote.expires_at_ms(),
                now_ms,
                "quote expired before execution"
            );
            return Err(ExecutionError::QuoteExpired {
                id: quote_id.clone(),
                expires_at_ms: quote.expires_at_ms(),
                now_ms,
            });
        }

        if let Err(err) = self.prepare(&quote, delegation) {
            warn!(quote_id = %quote_id, error = %err, "quote rejected at bind, returned to store");
            self.store.unclaim(quote_id);
            self.store.put(quote);
            return Err(err);
        }

        let call = quote.call();
        let descriptor = ExecutionDescriptor {
            quote_id: quote_id.clone(),
            group: quote.operation(),
            target: call.target,
            value: call.value,
            calldata: call.calldata.clone(),
            prepared_delegation: delegation.clone(),
        };
        info!(
            quote_id = %quote_id,
            group = %descriptor.group,
            target = %descriptor.target,
            "quote bound for execution"
        );
        Ok(descriptor)
    }

    fn prepare(&self, quote: &Quote, delegation: &mut Delegation) -> Result<(), ExecutionError> {
        let group = quote.operation();
        let or_enforcer = self.enforcers.logical_or_wrapper;
        let index = delegation
            .terms()
            .position(or_enforcer)
            .ok_or(ExecutionError::EnforcerMismatch {
                enforcer: or_enforcer,
            })?;

        if group == PolicyGroup::Approve {
            self.check_spender(quote)?;
        }

        if self.preflight {
            let violation = |cause: ValidationError| ExecutionError::PolicyViolation {
                id: quote.id().clone(),
                group,
                cause,
            };
            let groups = decode_groups(&delegation.terms().caveats()[index].terms)
                .map_err(|e| violation(e.into()))?;
            evaluate_group(&groups, group, quote.call(), &self.enforcers).map_err(violation)?;
        }

        set_selection(delegation, group, or_enforcer)?;
        Ok(())
    }

    /// Application-level spender allow-list for approvals. The on-chain approve group
    /// restricts neither token nor spender.
    fn check_spender(&self, quote: &Quote) -> Result<(), ExecutionError> {
        if self.approved_spenders.is_empty() {
            return Ok(());
        }
        let call = IERC20::approveCall::abi_decode(&quote.call().calldata, true).map_err(|e| {
            ExecutionError::PolicyViolation {
                id: quote.id().clone(),
                group: PolicyGroup::Approve,
                cause: ValidationError::MalformedCall(e.to_string()),
            }
        })?;
        if !self.approved_spenders.contains(&call.spender) {
            return Err(ExecutionError::SpenderNotAllowed {
                id: quote.id().clone(),
                spender: call.spender,
            });
        }
        Ok(())
    }

    /// Redemption succeeded: retire the quote for good. Idempotent.
    pub fn confirm_redeemed(&self, quote_id: &QuoteId) -> bool {
        let claimed = self.store.unclaim(quote_id).is_some();
        let stored = self.store.delete(quote_id);
        if claimed || stored {
            info!(quote_id = %quote_id, "quote redeemed");
        }
        claimed || stored
    }

    /// Redemption failed before broadcast: return the quote to the store if still live.
    pub fn release(&self, quote_id: &QuoteId) -> bool {
        let Some(quote) = self.store.unclaim(quote_id) else {
            return false;
        };
        if quote.is_expired_at(self.clock.now_ms()) {
            warn!(quote_id = %quote_id, "released quote already expired, dropping");
            return false;
        }
        self.store.put(quote);
        info!(quote_id = %quote_id, "quote released");
        true
    }

    /// Quotes bound and not yet confirmed, released or swept.
    pub fn claimed(&self) -> usize {
        self.store.claimed_len()
    }
}
