use crate::data::{MarketQuote, PositionEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `POST /auth` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthResponse {
    pub jwt_token: String,
}

/// `GET /positions` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionsResponse {
    pub results: Vec<PositionRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionRecord {
    pub market: String,
    /// Signed: negative for shorts
    pub size: Decimal,
    #[serde(default)]
    pub status: Option<String>,
}

impl PositionRecord {
    pub fn is_closed(&self) -> bool {
        self.status.as_deref() == Some("CLOSED")
    }
}

impl PositionsResponse {
    pub fn into_entries(self) -> Vec<PositionEntry> {
        self.results
            .into_iter()
            .filter(|p| !p.is_closed())
            .map(|p| PositionEntry {
                instrument: p.market,
                size: p.size,
            })
            .collect()
    }
}

/// `GET /vaults/summary?address=` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultSummaryResponse {
    pub results: Vec<VaultSummary>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultSummary {
    pub vtoken_supply: Decimal,
    pub vtoken_price: Decimal,
}

impl VaultSummary {
    /// Vault equity: outstanding shares times share price. `None` on overflow.
    pub fn equity(&self) -> Option<Decimal> {
        self.vtoken_supply.checked_mul(self.vtoken_price)
    }
}

/// `GET /bbo/{market}` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BboResponse {
    #[serde(default)]
    pub market: Option<String>,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl From<BboResponse> for MarketQuote {
    fn from(bbo: BboResponse) -> Self {
        MarketQuote::new(bbo.bid, bbo.ask)
    }
}
