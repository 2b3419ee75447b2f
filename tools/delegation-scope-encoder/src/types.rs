use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use delegation_scope_types::{Caveat, PolicyGroup};

use crate::{errors::EncodeError, interfaces::AbiSelectedGroup};

/// Authority value for a delegation issued directly by the root account.
pub const ROOT_AUTHORITY: B256 = B256::repeat_byte(0xff);

/// Addresses of the enforcement contracts the canonical policy is built against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcerSet {
    /// Checks the call selector against concatenated 4-byte selectors.
    pub allowed_methods: Address,
    /// Checks the call target against concatenated 20-byte addresses.
    pub allowed_targets: Address,
    /// Evaluates one caveat group out of several, chosen by the unsigned args.
    pub logical_or_wrapper: Address,
}

/// EIP-712 domain parameters of the delegation manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelegationDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

/// Signed half of a caveat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaveatTerms {
    pub enforcer: Address,
    pub terms: Bytes,
}

/// Ordered caveat terms covered by the delegation signature.
///
/// Constructed once and never mutated; clones share the same allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTerms {
    caveats: Arc<[CaveatTerms]>,
}

impl SignedTerms {
    /// Take the terms of each caveat. Any `args` present on the input are discarded.
    pub fn new(caveats: Vec<Caveat>) -> Self {
        let caveats: Vec<CaveatTerms> = caveats
            .into_iter()
            .map(|c| CaveatTerms {
                enforcer: c.enforcer,
                terms: Bytes::from(c.terms),
            })
            .collect();
        Self {
            caveats: caveats.into(),
        }
    }

    pub fn caveats(&self) -> &[CaveatTerms] {
        &self.caveats
    }

    pub fn len(&self) -> usize {
        self.caveats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caveats.is_empty()
    }

    /// Position of the first caveat enforced by `enforcer`.
    pub fn position(&self, enforcer: Address) -> Option<usize> {
        self.caveats.iter().position(|c| c.enforcer == enforcer)
    }
}

/// Execution-time choice of policy group, re-constructible as often as needed.
///
/// Always carries exactly one arg per caveat of its group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    group: PolicyGroup,
    caveat_args: Vec<Bytes>,
}

impl Selection {
    pub fn new(group: PolicyGroup, caveat_args: Vec<Bytes>) -> Result<Self, EncodeError> {
        if caveat_args.len() != group.caveat_count() {
            return Err(EncodeError::EncodingViolation(format!(
                "{group} group takes {} caveat args, got {}",
                group.caveat_count(),
                caveat_args.len()
            )));
        }
        Ok(Self { group, caveat_args })
    }

    /// Selection with one empty arg per caveat of `group`.
    pub fn placeholder(group: PolicyGroup) -> Self {
        Self {
            group,
            caveat_args: vec![Bytes::new(); group.caveat_count()],
        }
    }

    pub fn group(&self) -> PolicyGroup {
        self.group
    }

    pub fn caveat_args(&self) -> &[Bytes] {
        &self.caveat_args
    }

    /// ABI encoding of `(uint256 groupIndex, bytes[] caveatArgs)`.
    pub fn encode(&self) -> Vec<u8> {
        AbiSelectedGroup {
            groupIndex: U256::from(self.group.index()),
            caveatArgs: self.caveat_args.clone(),
        }
        .abi_encode()
    }
}

/// A grant of scoped call authority from `delegator` to `delegate`.
///
/// `terms` are fixed at construction and covered by the signature. `args` line up
/// positionally with `terms` and stay unsigned, so they may be rewritten before redemption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub delegator: Address,
    pub delegate: Address,
    pub authority: B256,
    pub salt: U256,
    terms: SignedTerms,
    args: Vec<Bytes>,
    signature: Bytes,
}

impl Delegation {
    pub fn new(
        delegator: Address,
        delegate: Address,
        authority: B256,
        salt: U256,
        terms: SignedTerms,
    ) -> Self {
        let args = vec![Bytes::new(); terms.len()];
        Self {
            delegator,
            delegate,
            authority,
            salt,
            terms,
            args,
            signature: Bytes::new(),
        }
    }

    pub fn terms(&self) -> &SignedTerms {
        &self.terms
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Attach a signature produced by an external signer over [`crate::delegation_digest`].
    pub fn attach_signature(&mut self, signature: Bytes) {
        self.signature = signature;
    }

    /// Args of the first caveat enforced by `enforcer`.
    pub fn args_for(&self, enforcer: Address) -> Option<&Bytes> {
        self.terms.position(enforcer).map(|i| &self.args[i])
    }

    /// Terms and args recombined, in redemption order.
    pub fn caveats(&self) -> Vec<Caveat> {
        self.terms
            .caveats()
            .iter()
            .zip(&self.args)
            .map(|(t, a)| Caveat {
                enforcer: t.enforcer,
                terms: t.terms.to_vec(),
                args: a.to_vec(),
            })
            .collect()
    }

    pub(crate) fn set_args(&mut self, index: usize, args: Vec<u8>) {
        self.args[index] = Bytes::from(args);
    }
}
