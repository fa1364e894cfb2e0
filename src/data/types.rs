use crate::error::{RebalanceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
}

/// Execution instruction attached to a limit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderInstruction {
    /// Rejected rather than allowed to take liquidity
    PostOnly,
}

/// Target fraction of vault equity to hold in the instrument.
///
/// Signed: negative values mean a short exposure. Not bounded here.
pub type ExposureTarget = Decimal;

/// Vault state read from the exchange at the start of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Signed position in instrument units
    pub position_size: Decimal,
    /// Vault equity in quote currency
    pub balance_value: Decimal,
}

impl AccountState {
    pub fn new(position_size: Decimal, balance_value: Decimal) -> Self {
        Self {
            position_size,
            balance_value,
        }
    }
}

/// Best bid / best ask for the traded instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl MarketQuote {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }

    /// Both sides positive and not crossed
    pub fn validate(&self) -> Result<()> {
        if self.bid <= Decimal::ZERO || self.ask <= Decimal::ZERO || self.bid > self.ask {
            return Err(RebalanceError::InvalidQuote {
                bid: self.bid,
                ask: self.ask,
            });
        }
        Ok(())
    }

    /// Resting-side price: a buy rests on the bid, a sell on the ask
    pub fn passive_price(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.bid,
            Side::Sell => self.ask,
        }
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// One open position as reported by the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub instrument: String,
    pub size: Decimal,
}

impl PositionEntry {
    /// Signed size held in `instrument`; flat when the exchange reports nothing
    pub fn size_for(positions: &[PositionEntry], instrument: &str) -> Decimal {
        positions
            .iter()
            .filter(|p| p.instrument == instrument)
            .map(|p| p.size)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_validation() {
        assert!(MarketQuote::new(dec!(50000), dec!(50001)).validate().is_ok());
        assert!(MarketQuote::new(dec!(50000), dec!(50000)).validate().is_ok());

        let zero_bid = MarketQuote::new(dec!(0), dec!(50001)).validate();
        assert!(matches!(zero_bid, Err(RebalanceError::InvalidQuote { .. })));

        let crossed = MarketQuote::new(dec!(50002), dec!(50001)).validate();
        assert!(matches!(crossed, Err(RebalanceError::InvalidQuote { .. })));

        let negative_ask = MarketQuote::new(dec!(1), dec!(-1)).validate();
        assert!(negative_ask.is_err());
    }

    #[test]
    fn test_passive_price() {
        let quote = MarketQuote::new(dec!(100.0), dec!(100.5));
        assert_eq!(quote.passive_price(Side::Buy), dec!(100.0));
        assert_eq!(quote.passive_price(Side::Sell), dec!(100.5));
        assert_eq!(quote.spread(), dec!(0.5));
    }

    #[test]
    fn test_position_lookup() {
        let positions = vec![
            PositionEntry { instrument: "ETH-USD-PERP".into(), size: dec!(3) },
            PositionEntry { instrument: "BTC-USD-PERP".into(), size: dec!(-0.25) },
        ];

        assert_eq!(PositionEntry::size_for(&positions, "BTC-USD-PERP"), dec!(-0.25));
        assert_eq!(PositionEntry::size_for(&positions, "SOL-USD-PERP"), Decimal::ZERO);
        assert_eq!(PositionEntry::size_for(&[], "BTC-USD-PERP"), Decimal::ZERO);
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&OrderInstruction::PostOnly).unwrap(), "\"POST_ONLY\"");
        assert_eq!(Side::Sell.as_str(), "SELL");
    }
}
