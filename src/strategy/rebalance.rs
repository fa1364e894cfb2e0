use crate::data::{AccountState, ExposureTarget, MarketQuote, Side};
use crate::error::{RebalanceError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Minimum absolute size worth placing (instrument units)
pub const DEFAULT_DUST_THRESHOLD: Decimal = dec!(0.002);

/// Decimal places the size delta is truncated to
pub const DEFAULT_SIZE_DECIMALS: u32 = 2;

/// Side and size needed to move the vault toward its target exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceDecision {
    pub side: Side,
    pub size: Decimal,
}

impl RebalanceDecision {
    /// Passive limit price for this decision
    pub fn limit_price(&self, quote: &MarketQuote) -> Decimal {
        quote.passive_price(self.side)
    }
}

/// Sizing parameters that stay fixed for the life of the worker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebalanceParams {
    pub leverage_multiplier: Decimal,
    pub dust_threshold: Decimal,
    pub size_decimals: u32,
}

impl Default for RebalanceParams {
    fn default() -> Self {
        Self {
            leverage_multiplier: dec!(50),
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            size_decimals: DEFAULT_SIZE_DECIMALS,
        }
    }
}

/// Compute the order needed to bring the position to `target` of vault equity.
///
/// Sizing always divides by the bid, whichever way the trade goes. The raw
/// delta is truncated toward zero, so the vault slightly under-trades rather
/// than overshoots. Returns `Ok(None)` when the truncated delta is dust.
pub fn compute_rebalance(
    target: ExposureTarget,
    account: &AccountState,
    quote: &MarketQuote,
    leverage_multiplier: Decimal,
    dust_threshold: Decimal,
) -> Result<Option<RebalanceDecision>> {
    compute_rebalance_with(
        target,
        account,
        quote,
        &RebalanceParams {
            leverage_multiplier,
            dust_threshold,
            size_decimals: DEFAULT_SIZE_DECIMALS,
        },
    )
}

pub fn compute_rebalance_with(
    target: ExposureTarget,
    account: &AccountState,
    quote: &MarketQuote,
    params: &RebalanceParams,
) -> Result<Option<RebalanceDecision>> {
    quote.validate()?;

    let expected_value = account
        .balance_value
        .checked_mul(target)
        .and_then(|v| v.checked_mul(params.leverage_multiplier))
        .ok_or_else(|| {
            RebalanceError::Computation(format!(
                "expected position value overflows: balance {} * target {} * leverage {}",
                account.balance_value, target, params.leverage_multiplier
            ))
        })?;

    let expected_size = expected_value.checked_div(quote.bid).ok_or_else(|| {
        RebalanceError::Computation(format!(
            "expected position size overflows: {} / {}",
            expected_value, quote.bid
        ))
    })?;

    let raw_delta = expected_size
        .checked_sub(account.position_size)
        .ok_or_else(|| RebalanceError::Computation("position delta overflows".to_string()))?;

    let delta = truncate(raw_delta, params.size_decimals);

    if delta.is_zero() || delta.abs() < params.dust_threshold {
        return Ok(None);
    }

    let side = if delta.is_sign_negative() { Side::Sell } else { Side::Buy };

    Ok(Some(RebalanceDecision {
        side,
        size: delta.abs(),
    }))
}

/// Truncate toward zero; never rounds up
fn truncate(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}
