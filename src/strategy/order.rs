use crate::data::{MarketQuote, OrderInstruction, OrderType, Side};
use crate::exchange::Credentials;
use crate::strategy::RebalanceDecision;
use crate::utils::signing;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A post-only limit order, built and signed once per cycle.
///
/// Serializes to the JSON body the exchange expects on `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOrder {
    #[serde(rename = "market")]
    pub instrument: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub instruction: OrderInstruction,
    pub price: Decimal,
    pub size: Decimal,
    pub client_id: String,
    /// Milliseconds since epoch, captured at build time
    pub signature_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl RebalanceOrder {
    /// Canonical string covered by the signature.
    ///
    /// Decimals are normalized so `2` and `2.00` sign identically.
    pub fn signing_payload(&self) -> String {
        format!(
            "order|{}|{}|{}|LIMIT|POST_ONLY|{}|{}|{}",
            self.signature_timestamp,
            self.instrument,
            self.side.as_str(),
            self.price.normalize(),
            self.size.normalize(),
            self.client_id,
        )
    }

    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// Build an unsigned post-only limit order stamped with the current time
pub fn build_order(
    side: Side,
    price: Decimal,
    size: Decimal,
    instrument: &str,
    client_id: &str,
) -> RebalanceOrder {
    build_order_at(side, price, size, instrument, client_id, signing::get_timestamp())
}

pub fn build_order_at(
    side: Side,
    price: Decimal,
    size: Decimal,
    instrument: &str,
    client_id: &str,
    timestamp_ms: i64,
) -> RebalanceOrder {
    RebalanceOrder {
        instrument: instrument.to_string(),
        side,
        order_type: OrderType::Limit,
        instruction: OrderInstruction::PostOnly,
        price,
        size,
        client_id: client_id.to_string(),
        signature_timestamp: timestamp_ms,
        signature: None,
    }
}

/// Sign the order payload with the account key. Pure: no I/O.
pub fn sign(order: &RebalanceOrder, credentials: &Credentials) -> String {
    signing::generate_signature(&credentials.account_key, &order.signing_payload())
}

/// Turn a rebalance decision into a signed order resting on the passive side
pub fn build_signed_order(
    decision: &RebalanceDecision,
    quote: &MarketQuote,
    instrument: &str,
    client_id: &str,
    credentials: &Credentials,
) -> RebalanceOrder {
    let order = build_order(
        decision.side,
        decision.limit_price(quote),
        decision.size,
        instrument,
        client_id,
    );
    let signature = sign(&order, credentials);
    order.with_signature(signature)
}
