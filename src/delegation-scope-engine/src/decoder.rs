//! Decoding of caveat terms, group selections and calldata.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;

use delegation_scope_encoder::interfaces::{AbiCaveatGroup, AbiSelectedGroup};
use delegation_scope_types::{Caveat, CaveatGroup, Selector};

use crate::errors::DecodeError;

/// Decoded execution-time selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedSelection {
    pub group_index: usize,
    pub caveat_args: Vec<Bytes>,
}

/// Split allowed-methods terms back into selectors.
pub fn decode_selectors(bytes: &[u8]) -> Result<Vec<Selector>, DecodeError> {
    check_width(bytes, 4, "allowed-methods")?;
    let mut out = Vec::with_capacity(bytes.len() / 4);
    let mut i = 0usize;
    while i < bytes.len() {
        out.push(read_selector(bytes, &mut i)?);
    }
    Ok(out)
}

/// Split allowed-targets terms back into addresses.
pub fn decode_targets(bytes: &[u8]) -> Result<Vec<Address>, DecodeError> {
    check_width(bytes, 20, "allowed-targets")?;
    let mut out = Vec::with_capacity(bytes.len() / 20);
    let mut i = 0usize;
    while i < bytes.len() {
        out.push(read_address(bytes, &mut i)?);
    }
    Ok(out)
}

/// Decode logical-OR wrapper terms into caveat groups.
pub fn decode_groups(bytes: &[u8]) -> Result<Vec<CaveatGroup>, DecodeError> {
    let groups = <Vec<AbiCaveatGroup>>::abi_decode(bytes, true)
        .map_err(|e| DecodeError::Abi(e.to_string()))?;
    Ok(groups
        .into_iter()
        .map(|g| CaveatGroup {
            caveats: g
                .caveats
                .into_iter()
                .map(|c| Caveat {
                    enforcer: c.enforcer,
                    terms: c.terms.to_vec(),
                    args: c.args.to_vec(),
                })
                .collect(),
        })
        .collect())
}

/// Decode the wrapper caveat's args.
pub fn decode_selection(bytes: &[u8]) -> Result<DecodedSelection, DecodeError> {
    let selected =
        AbiSelectedGroup::abi_decode(bytes, true).map_err(|e| DecodeError::Abi(e.to_string()))?;
    let group_index = usize::try_from(selected.groupIndex)
        .map_err(|_| DecodeError::Abi("group index out of range".into()))?;
    Ok(DecodedSelection {
        group_index,
        caveat_args: selected.caveatArgs,
    })
}

/// Leading four bytes of calldata.
pub fn call_selector(calldata: &[u8]) -> Result<Selector, DecodeError> {
    let mut i = 0usize;
    read_selector(calldata, &mut i)
}

fn check_width(bytes: &[u8], width: usize, what: &'static str) -> Result<(), DecodeError> {
    if bytes.len() % width != 0 {
        return Err(DecodeError::BadLength {
            what,
            len: bytes.len(),
            width,
        });
    }
    Ok(())
}

fn read_selector(bytes: &[u8], i: &mut usize) -> Result<Selector, DecodeError> {
    if bytes.len() < *i + 4 {
        return Err(DecodeError::Truncated);
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&bytes[*i..*i + 4]);
    *i += 4;
    Ok(sel)
}

fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, DecodeError> {
    if bytes.len() < *i + 20 {
        return Err(DecodeError::Truncated);
    }
    let addr = Address::from_slice(&bytes[*i..*i + 20]);
    *i += 20;
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use delegation_scope_encoder::{
        build_base_delegation_caveat, encode_selectors, encode_targets, EnforcerSet,
        APPROVE_SELECTOR,
    };
    use delegation_scope_types::PolicyGroup;

    #[test]
    fn selectors_and_targets_round_trip() {
        let selectors = vec![[0x12, 0x34, 0x56, 0x78], APPROVE_SELECTOR];
        assert_eq!(decode_selectors(&encode_selectors(&selectors)).unwrap(), selectors);

        let targets = vec![
            address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
        ];
        assert_eq!(decode_targets(&encode_targets(&targets)).unwrap(), targets);
    }

    #[test]
    fn ragged_terms_are_rejected() {
        assert_eq!(
            decode_selectors(&[1, 2, 3, 4, 5]),
            Err(DecodeError::BadLength {
                what: "allowed-methods",
                len: 5,
                width: 4
            })
        );
        assert!(decode_targets(&[0u8; 21]).is_err());
        assert_eq!(call_selector(&[0xde, 0xad]), Err(DecodeError::Truncated));
    }

    #[test]
    fn groups_decode_in_canonical_order() {
        let enforcers = EnforcerSet {
            allowed_methods: address!("1111111111111111111111111111111111111111"),
            allowed_targets: address!("2222222222222222222222222222222222222222"),
            logical_or_wrapper: address!("3333333333333333333333333333333333333333"),
        };
        let caveat = build_base_delegation_caveat(
            &enforcers,
            &[address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")],
            &[[0x12, 0x34, 0x56, 0x78]],
        )
        .unwrap();
        let groups = decode_groups(&caveat.terms).unwrap();
        for group in PolicyGroup::ALL {
            assert_eq!(groups[group.index()].len(), group.caveat_count());
        }
        assert!(decode_groups(&[0u8; 7]).is_err());
    }
}
