use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolValue;
use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use delegation_scope_types::{Caveat, CaveatGroup, PolicyGroup, Selector, APPROVE_SELECTOR};

use crate::errors::EncodeError;
use crate::interfaces::{AbiCaveat, AbiCaveatGroup};
use crate::types::{Delegation, DelegationDomain, EnforcerSet, Selection};

/// Concatenate selectors, no length prefix. Terms for the allowed-methods enforcer.
pub fn encode_selectors(selectors: &[Selector]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(selectors.len() * 4);
    for selector in selectors {
        buf.extend_from_slice(selector);
    }
    buf
}

/// Concatenate 20-byte addresses, no length prefix. Terms for the allowed-targets enforcer.
pub fn encode_targets(targets: &[Address]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(targets.len() * 20);
    for target in targets {
        buf.extend_from_slice(target.as_slice());
    }
    buf
}

/// Parse a `0x`-prefixed 4-byte selector.
pub fn parse_selector(raw: &str) -> Result<Selector, EncodeError> {
    let bytes = decode_hex_exact(raw, 4, "selector")?;
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&bytes);
    Ok(selector)
}

/// Parse a 20-byte address in any hex letter case. Checksums are not enforced.
pub fn parse_target(raw: &str) -> Result<Address, EncodeError> {
    let bytes = decode_hex_exact(raw, 20, "target")?;
    Ok(Address::from_slice(&bytes))
}

fn decode_hex_exact(raw: &str, width: usize, what: &str) -> Result<Vec<u8>, EncodeError> {
    let lower = raw.trim().to_ascii_lowercase();
    let digits = lower.strip_prefix("0x").unwrap_or(&lower);
    if digits.len() != width * 2 {
        return Err(EncodeError::EncodingViolation(format!(
            "{what} `{raw}` must be {width} bytes"
        )));
    }
    hex::decode(digits)
        .map_err(|e| EncodeError::EncodingViolation(format!("{what} `{raw}` is not hex: {e}")))
}

/// Approve group: one caveat pinning the selector to `approve`.
///
/// No target caveat: approvals are grantable on any token contract and the spender is left
/// to application policy.
pub fn build_approve_group(enforcers: &EnforcerSet) -> CaveatGroup {
    CaveatGroup {
        caveats: vec![Caveat::new(
            enforcers.allowed_methods,
            encode_selectors(&[APPROVE_SELECTOR]),
        )],
    }
}

/// Trading group: target allow-list AND selector allow-list.
///
/// Empty lists are rejected: the enforcers refuse empty terms, so such a group could never pass.
pub fn build_trading_group(
    enforcers: &EnforcerSet,
    targets: &[Address],
    selectors: &[Selector],
) -> Result<CaveatGroup, EncodeError> {
    if targets.is_empty() {
        return Err(EncodeError::EncodingViolation(
            "trading group needs at least one target".into(),
        ));
    }
    if selectors.is_empty() {
        return Err(EncodeError::EncodingViolation(
            "trading group needs at least one selector".into(),
        ));
    }
    Ok(CaveatGroup {
        caveats: vec![
            Caveat::new(enforcers.allowed_targets, encode_targets(targets)),
            Caveat::new(enforcers.allowed_methods, encode_selectors(selectors)),
        ],
    })
}

pub fn build_group(
    group: PolicyGroup,
    enforcers: &EnforcerSet,
    targets: &[Address],
    selectors: &[Selector],
) -> Result<CaveatGroup, EncodeError> {
    match group {
        PolicyGroup::Approve => Ok(build_approve_group(enforcers)),
        PolicyGroup::Trading => build_trading_group(enforcers, targets, selectors),
    }
}

/// ABI-encode `CaveatGroup[]` for the logical-OR wrapper.
///
/// Every nested `args` is written as empty bytes; args are only supplied through the
/// selection at execution time.
pub fn assemble_terms(groups: &[CaveatGroup]) -> Result<Vec<u8>, EncodeError> {
    if groups.is_empty() {
        return Err(EncodeError::EncodingViolation("no caveat groups".into()));
    }
    let mut encoded: Vec<AbiCaveatGroup> = Vec::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(EncodeError::EncodingViolation(format!(
                "caveat group {i} is empty"
            )));
        }
        encoded.push(AbiCaveatGroup {
            caveats: group
                .caveats
                .iter()
                .map(|c| AbiCaveat {
                    enforcer: c.enforcer,
                    terms: Bytes::copy_from_slice(&c.terms),
                    args: Bytes::new(),
                })
                .collect(),
        });
    }
    Ok(encoded.abi_encode())
}

/// The canonical base delegation caveat: `[approve, trading]` under the logical-OR wrapper.
pub fn build_base_delegation_caveat(
    enforcers: &EnforcerSet,
    targets: &[Address],
    selectors: &[Selector],
) -> Result<Caveat, EncodeError> {
    let mut groups = Vec::with_capacity(PolicyGroup::ALL.len());
    for group in PolicyGroup::ALL {
        groups.push(build_group(group, enforcers, targets, selectors)?);
    }
    Ok(Caveat::new(
        enforcers.logical_or_wrapper,
        assemble_terms(&groups)?,
    ))
}

/// ABI-encode `(uint256 groupIndex, bytes[] caveatArgs)` for `group`.
///
/// `caveat_args` must hold exactly one entry per caveat of the group.
pub fn encode_selection(
    group: PolicyGroup,
    caveat_args: &[Vec<u8>],
) -> Result<Vec<u8>, EncodeError> {
    let args = caveat_args.iter().map(|a| Bytes::copy_from_slice(a)).collect();
    Ok(Selection::new(group, args)?.encode())
}

/// Point the delegation's group-selection caveat at `group`.
///
/// Only the args of the wrapper caveat change. A delegation without that caveat is an error.
pub fn set_selection(
    delegation: &mut Delegation,
    group: PolicyGroup,
    or_enforcer: Address,
) -> Result<(), EncodeError> {
    let index = delegation
        .terms()
        .position(or_enforcer)
        .ok_or(EncodeError::EnforcerMismatch {
            enforcer: or_enforcer,
        })?;
    delegation.set_args(index, Selection::placeholder(group).encode());
    Ok(())
}

fn keccak256_bytes(bytes: &[u8]) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    FixedBytes(b)
}

fn pad_address(address: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

/// EIP-712 struct hash of the delegation. Caveat args never contribute.
pub fn delegation_hash(delegation: &Delegation) -> B256 {
    let caveat_type_hash = keccak256_bytes(b"Caveat(address enforcer,bytes terms)");
    let delegation_type_hash = keccak256_bytes(
        b"Delegation(address delegate,address delegator,bytes32 authority,Caveat[] caveats,uint256 salt)Caveat(address enforcer,bytes terms)",
    );

    let mut caveat_hashes = Vec::with_capacity(32 * delegation.terms().len());
    for caveat in delegation.terms().caveats() {
        let mut buf = Vec::with_capacity(32 * 3);
        buf.extend_from_slice(caveat_type_hash.as_slice());
        buf.extend_from_slice(&pad_address(caveat.enforcer));
        buf.extend_from_slice(keccak256_bytes(&caveat.terms).as_slice());
        caveat_hashes.extend_from_slice(keccak256_bytes(&buf).as_slice());
    }
    let caveats_hash = keccak256_bytes(&caveat_hashes);

    let mut struct_buf = Vec::with_capacity(32 * 6);
    struct_buf.extend_from_slice(delegation_type_hash.as_slice());
    struct_buf.extend_from_slice(&pad_address(delegation.delegate));
    struct_buf.extend_from_slice(&pad_address(delegation.delegator));
    struct_buf.extend_from_slice(delegation.authority.as_slice());
    struct_buf.extend_from_slice(caveats_hash.as_slice());
    struct_buf.extend_from_slice(&delegation.salt.to_be_bytes::<32>());
    keccak256_bytes(&struct_buf)
}

/// Typed-data digest the delegator signs.
pub fn delegation_digest(delegation: &Delegation, domain: &DelegationDomain) -> B256 {
    let domain_type_hash = keccak256_bytes(
        b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    );
    let domain_name_hash = keccak256_bytes(b"DelegationManager");
    let domain_version_hash = keccak256_bytes(b"1");

    let mut domain_buf = Vec::with_capacity(32 * 5);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(domain_name_hash.as_slice());
    domain_buf.extend_from_slice(domain_version_hash.as_slice());
    domain_buf.extend_from_slice(&U256::from(domain.chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(&pad_address(domain.verifying_contract));
    let domain_separator = keccak256_bytes(&domain_buf);

    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator.as_slice());
    final_buf.extend_from_slice(delegation_hash(delegation).as_slice());
    keccak256_bytes(&final_buf)
}

/// Sign the delegation digest with a local key and attach the 65-byte `r||s||v` signature.
pub fn sign_delegation(
    delegation: &mut Delegation,
    domain: &DelegationDomain,
    signing_key: &SigningKey,
) -> Result<(), EncodeError> {
    let digest = delegation_digest(delegation, domain);
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|e| EncodeError::Signing(e.to_string()))?;

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(&signature.to_bytes());
    sig_bytes.push(27 + recovery_id.to_byte());
    delegation.attach_signature(Bytes::from(sig_bytes));
    Ok(())
}
