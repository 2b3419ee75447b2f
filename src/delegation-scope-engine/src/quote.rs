//! Quote records and pricing.

use alloy_primitives::{Address, Bytes, U256};
use serde::Serialize;

use delegation_scope_types::{PolicyGroup, QuoteId, Venue};

const BPS: u64 = 10_000;

/// How a venue derives the expected output for `amount_in`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pricing {
    /// Output already computed by the source (aggregator APIs).
    Quoted { amount_out: U256 },
    /// x*y=k curve with a fee taken from the input (bonding-curve venues).
    ConstantProduct {
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u16,
    },
    /// Fixed mark price, output units per input unit scaled by 1e18 (perp venues).
    Mark { price_e18: U256 },
}

impl Pricing {
    /// `None` on overflow, empty reserves or a fee above 100%.
    pub fn expected_out(&self, amount_in: U256) -> Option<U256> {
        match self {
            Pricing::Quoted { amount_out } => Some(*amount_out),
            Pricing::ConstantProduct {
                reserve_in,
                reserve_out,
                fee_bps,
            } => {
                if reserve_in.is_zero() || reserve_out.is_zero() || u64::from(*fee_bps) > BPS {
                    return None;
                }
                let in_after_fee = amount_in
                    .checked_mul(U256::from(BPS - u64::from(*fee_bps)))?
                    / U256::from(BPS);
                let numerator = in_after_fee.checked_mul(*reserve_out)?;
                let denominator = reserve_in.checked_add(in_after_fee)?;
                Some(numerator / denominator)
            }
            Pricing::Mark { price_e18 } => {
                Some(amount_in.checked_mul(*price_e18)? / U256::from(1_000_000_000_000_000_000u64))
            }
        }
    }
}

/// `expected_out` reduced by `slippage_bps`.
pub fn min_out_after_slippage(expected_out: U256, slippage_bps: u16) -> U256 {
    let keep = BPS.saturating_sub(u64::from(slippage_bps));
    // Divide first only when the multiply would overflow.
    match expected_out.checked_mul(U256::from(keep)) {
        Some(scaled) => scaled / U256::from(BPS),
        None => expected_out / U256::from(BPS) * U256::from(keep),
    }
}

/// The exact call a quote authorises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundCall {
    pub target: Address,
    pub calldata: Bytes,
    pub value: U256,
}

/// Venue builder output, turned into a [`Quote`] by the manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteParams {
    pub operation: PolicyGroup,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub slippage_bps: u16,
    pub pricing: Pricing,
    pub call: BoundCall,
    /// Overrides the configured TTL.
    pub ttl_ms: Option<u64>,
    /// Venue-imposed deadline; the quote expires at the earlier of this and its TTL.
    pub deadline_ms: Option<u64>,
}

/// Ephemeral, time-bounded record binding a computed trade to exact calldata.
///
/// Immutable once built; the store only ever inserts or removes it whole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    id: QuoteId,
    source_tag: String,
    operation: PolicyGroup,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    expected_out: U256,
    min_out: U256,
    slippage_bps: u16,
    created_at_ms: u64,
    expires_at_ms: u64,
    call: BoundCall,
}

impl Quote {
    pub(crate) fn new(
        id: QuoteId,
        source_tag: String,
        params: QuoteParams,
        expected_out: U256,
        min_out: U256,
        created_at_ms: u64,
        expires_at_ms: u64,
    ) -> Self {
        Self {
            id,
            source_tag,
            operation: params.operation,
            token_in: params.token_in,
            token_out: params.token_out,
            amount_in: params.amount_in,
            expected_out,
            min_out,
            slippage_bps: params.slippage_bps,
            created_at_ms,
            expires_at_ms,
            call: params.call,
        }
    }

    pub fn id(&self) -> &QuoteId {
        &self.id
    }

    pub fn venue(&self) -> Venue {
        self.id.venue()
    }

    pub fn operation(&self) -> PolicyGroup {
        self.operation
    }

    pub fn expires_at_ms(&self) -> u64 {
        self.expires_at_ms
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    pub(crate) fn call(&self) -> &BoundCall {
        &self.call
    }

    /// Read-only projection without the bound calldata.
    pub fn view(&self) -> QuoteView {
        QuoteView {
            id: self.id.to_string(),
            venue: self.id.venue(),
            source_tag: self.source_tag.clone(),
            operation: self.operation,
            token_in: self.token_in,
            token_out: self.token_out,
            amount_in: self.amount_in,
            expected_out: self.expected_out,
            min_out: self.min_out,
            slippage_bps: self.slippage_bps,
            created_at_ms: self.created_at_ms,
            expires_at_ms: self.expires_at_ms,
            target: self.call.target,
            value: self.call.value,
        }
    }
}

/// What callers outside the binder get to see of a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteView {
    /// Wire-form id, venue prefix included.
    pub id: String,
    #[serde(serialize_with = "serialize_display")]
    pub venue: Venue,
    pub source_tag: String,
    #[serde(serialize_with = "serialize_display")]
    pub operation: PolicyGroup,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub expected_out: U256,
    pub min_out: U256,
    pub slippage_bps: u16,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
    pub target: Address,
    pub value: U256,
}

fn serialize_display<T: std::fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_product_takes_fee_from_input() {
        let pricing = Pricing::ConstantProduct {
            reserve_in: U256::from(1_000u64),
            reserve_out: U256::from(1_000u64),
            fee_bps: 100,
        };
        // 100 in, 99 after fee: 99 * 1000 / 1099 = 90
        assert_eq!(pricing.expected_out(U256::from(100u64)), Some(U256::from(90u64)));
    }

    #[test]
    fn constant_product_rejects_empty_reserves() {
        let pricing = Pricing::ConstantProduct {
            reserve_in: U256::ZERO,
            reserve_out: U256::from(1u64),
            fee_bps: 0,
        };
        assert_eq!(pricing.expected_out(U256::from(1u64)), None);
    }

    #[test]
    fn mark_price_scales_by_1e18() {
        let pricing = Pricing::Mark {
            price_e18: U256::from(2_500_000_000_000_000_000u64),
        };
        assert_eq!(pricing.expected_out(U256::from(4u64)), Some(U256::from(10u64)));
    }

    #[test]
    fn slippage_floor() {
        assert_eq!(min_out_after_slippage(U256::from(10_000u64), 50), U256::from(9_950u64));
        assert_eq!(min_out_after_slippage(U256::from(10_000u64), 0), U256::from(10_000u64));
        assert_eq!(min_out_after_slippage(U256::MAX, 0), U256::MAX / U256::from(BPS) * U256::from(BPS));
    }
}
