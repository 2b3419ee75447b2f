//! Off-chain mirror of the enforcer checks for one selected group.

use alloy_primitives::{Address, FixedBytes};

use delegation_scope_encoder::EnforcerSet;
use delegation_scope_types::{CaveatGroup, PolicyGroup};

use crate::{
    decoder::{call_selector, decode_selectors, decode_targets},
    errors::ValidationError,
    quote::BoundCall,
};

/// Enforcers understood off-chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnforcerKind {
    AllowedMethods,
    AllowedTargets,
}

pub fn enforcer_kind(enforcers: &EnforcerSet, enforcer: Address) -> Option<EnforcerKind> {
    if enforcer == enforcers.allowed_methods {
        Some(EnforcerKind::AllowedMethods)
    } else if enforcer == enforcers.allowed_targets {
        Some(EnforcerKind::AllowedTargets)
    } else {
        None
    }
}

/// Evaluate every caveat of `group` against `call`. Unknown enforcers fail closed.
pub fn evaluate_group(
    groups: &[CaveatGroup],
    group: PolicyGroup,
    call: &BoundCall,
    enforcers: &EnforcerSet,
) -> Result<(), ValidationError> {
    let selected = groups
        .get(group.index())
        .ok_or(ValidationError::UnknownGroup(group.index()))?;
    if selected.len() != group.caveat_count() {
        return Err(ValidationError::GroupShape {
            group,
            expected: group.caveat_count(),
            actual: selected.len(),
        });
    }

    let selector = call_selector(&call.calldata)?;
    for caveat in &selected.caveats {
        match enforcer_kind(enforcers, caveat.enforcer) {
            Some(EnforcerKind::AllowedMethods) => {
                if !decode_selectors(&caveat.terms)?.contains(&selector) {
                    return Err(ValidationError::MethodNotAllowed(FixedBytes(selector)));
                }
            }
            Some(EnforcerKind::AllowedTargets) => {
                if !decode_targets(&caveat.terms)?.contains(&call.target) {
                    return Err(ValidationError::TargetNotAllowed(call.target));
                }
            }
            None => return Err(ValidationError::UnsupportedCaveat(caveat.enforcer)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Bytes, U256};
    use delegation_scope_encoder::{build_approve_group, build_trading_group};
    use delegation_scope_types::Caveat;

    fn enforcers() -> EnforcerSet {
        EnforcerSet {
            allowed_methods: address!("1111111111111111111111111111111111111111"),
            allowed_targets: address!("2222222222222222222222222222222222222222"),
            logical_or_wrapper: address!("3333333333333333333333333333333333333333"),
        }
    }

    fn groups() -> Vec<CaveatGroup> {
        vec![
            build_approve_group(&enforcers()),
            build_trading_group(
                &enforcers(),
                &[address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")],
                &[[0x12, 0x34, 0x56, 0x78]],
            )
            .unwrap(),
        ]
    }

    fn call(target: Address, calldata: &'static [u8]) -> BoundCall {
        BoundCall {
            target,
            calldata: Bytes::from_static(calldata),
            value: U256::ZERO,
        }
    }

    #[test]
    fn trading_call_passes_both_caveats() {
        let ok = call(
            address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            &[0x12, 0x34, 0x56, 0x78, 0x00],
        );
        assert_eq!(evaluate_group(&groups(), PolicyGroup::Trading, &ok, &enforcers()), Ok(()));
    }

    #[test]
    fn trading_call_to_unlisted_target_fails() {
        let other = address!("cccccccccccccccccccccccccccccccccccccccc");
        let bad = call(other, &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(
            evaluate_group(&groups(), PolicyGroup::Trading, &bad, &enforcers()),
            Err(ValidationError::TargetNotAllowed(other))
        );
    }

    #[test]
    fn approve_group_accepts_any_token_but_only_approve() {
        let token = address!("dddddddddddddddddddddddddddddddddddddddd");
        let approve = call(token, &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(evaluate_group(&groups(), PolicyGroup::Approve, &approve, &enforcers()), Ok(()));

        let transfer = call(token, &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(
            evaluate_group(&groups(), PolicyGroup::Approve, &transfer, &enforcers()),
            Err(ValidationError::MethodNotAllowed(FixedBytes([0xa9, 0x05, 0x9c, 0xbb])))
        );
    }

    #[test]
    fn unknown_enforcer_fails_closed() {
        let stranger = address!("9999999999999999999999999999999999999999");
        let groups = vec![CaveatGroup {
            caveats: vec![Caveat::new(stranger, vec![])],
        }];
        let approve = call(Address::ZERO, &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(
            evaluate_group(&groups, PolicyGroup::Approve, &approve, &enforcers()),
            Err(ValidationError::UnsupportedCaveat(stranger))
        );
    }
}
