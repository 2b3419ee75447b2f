use alloc::vec::Vec;
use core::fmt;

use alloy_primitives::Address;

/// Four-byte function selector.
pub type Selector = [u8; 4];

/// ERC-20 `approve(address,uint256)`.
pub const APPROVE_SELECTOR: Selector = [0x09, 0x5e, 0xa7, 0xb3];

/// Policy groups of the canonical base delegation caveat.
///
/// The discriminant is the group's position inside the logical-OR terms. Group 0 is always
/// `Approve` and group 1 is always `Trading`; nothing else may reorder them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PolicyGroup {
    /// One caveat: selector must be `approve`. No target restriction.
    Approve = 0,
    /// Two caveats: target allow-list AND selector allow-list.
    Trading = 1,
}

impl PolicyGroup {
    pub const ALL: [PolicyGroup; 2] = [PolicyGroup::Approve, PolicyGroup::Trading];

    /// Position of this group inside the assembled terms.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of caveats the group is built with; selection args must match it.
    pub const fn caveat_count(self) -> usize {
        match self {
            PolicyGroup::Approve => 1,
            PolicyGroup::Trading => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PolicyGroup::Approve => "approve",
            PolicyGroup::Trading => "trading",
        }
    }
}

impl TryFrom<u8> for PolicyGroup {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PolicyGroup::Approve),
            1 => Ok(PolicyGroup::Trading),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PolicyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One machine-checkable condition attached to a delegation.
///
/// `terms` are fixed when the group is built and end up under the signature.
/// `args` are chosen at execution time and are never signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caveat {
    pub enforcer: Address,
    pub terms: Vec<u8>,
    pub args: Vec<u8>,
}

impl Caveat {
    /// Caveat with empty `args`.
    pub fn new(enforcer: Address, terms: Vec<u8>) -> Self {
        Self {
            enforcer,
            terms,
            args: Vec::new(),
        }
    }
}

/// Caveats combined with logical AND. Order is significant for positional args.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaveatGroup {
    pub caveats: Vec<Caveat>,
}

impl CaveatGroup {
    pub fn len(&self) -> usize {
        self.caveats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caveats.is_empty()
    }
}
