use crate::data::{MarketQuote, PositionEntry};
use crate::error::Result;
use crate::strategy::RebalanceOrder;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

/// Account identity used to authenticate and to sign orders
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub account_key: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, account_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            account_key: account_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

/// Bearer token returned by `authenticate`, valid for the current cycle
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Everything the cycle driver needs from the exchange
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken>;

    async fn get_positions(&self, session: &SessionToken) -> Result<Vec<PositionEntry>>;

    /// Vault equity in quote currency
    async fn get_account_value(&self, vault_id: &str) -> Result<Decimal>;

    async fn get_quote(&self, instrument: &str) -> Result<MarketQuote>;

    async fn cancel_all_orders(&self, session: &SessionToken) -> Result<()>;

    async fn submit_order(&self, session: &SessionToken, order: &RebalanceOrder) -> Result<()>;
}
