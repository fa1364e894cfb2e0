use crate::data::{MarketQuote, PositionEntry};
use crate::error::{RebalanceError, Result};
use crate::exchange::http::auth;
use crate::exchange::http::types::{AuthResponse, BboResponse, PositionsResponse, VaultSummaryResponse};
use crate::exchange::{Credentials, ExchangeClient, SessionToken};
use crate::strategy::RebalanceOrder;
use crate::utils::signing;
use async_trait::async_trait;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

/// REST client for the vault's exchange account
pub struct RestExchangeClient {
    client: Client,
    base_url: String,
}

impl RestExchangeClient {
    /// Create new REST client; every request is bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RebalanceError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a JSON body, mapping transport errors and non-2xx statuses through `to_err`
async fn read_json<T, F>(response: reqwest::Result<Response>, to_err: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(String) -> RebalanceError,
{
    let response = check_status(response, &to_err).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| to_err(format!("invalid response body: {}", e)))
}

async fn check_status<F>(response: reqwest::Result<Response>, to_err: &F) -> Result<Response>
where
    F: Fn(String) -> RebalanceError,
{
    let response = response.map_err(|e| to_err(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(to_err(format!("{} - {}", status, error_text)));
    }

    Ok(response)
}

#[async_trait]
impl ExchangeClient for RestExchangeClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken> {
        let timestamp = signing::get_timestamp();
        let mut request = self.client.post(self.url("/auth"));
        for (name, value) in auth::auth_headers(&credentials.account_id, &credentials.account_key, timestamp) {
            request = request.header(name, value);
        }

        let body: AuthResponse = read_json(request.send().await, RebalanceError::Auth).await?;
        debug!(account = %credentials.account_id, "Session token acquired");

        Ok(SessionToken::new(body.jwt_token))
    }

    async fn get_positions(&self, session: &SessionToken) -> Result<Vec<PositionEntry>> {
        let response = self
            .client
            .get(self.url("/positions"))
            .bearer_auth(session.as_str())
            .send()
            .await;

        let body: PositionsResponse =
            read_json(response, |e| RebalanceError::fetch("positions", e)).await?;

        Ok(body.into_entries())
    }

    async fn get_account_value(&self, vault_id: &str) -> Result<Decimal> {
        let response = self
            .client
            .get(self.url("/vaults/summary"))
            .query(&[("address", vault_id)])
            .send()
            .await;

        let body: VaultSummaryResponse =
            read_json(response, |e| RebalanceError::fetch("account value", e)).await?;

        let summary = body.results.first().ok_or_else(|| {
            RebalanceError::fetch("account value", format!("no summary for vault {}", vault_id))
        })?;

        let equity = summary.equity().ok_or_else(|| {
            RebalanceError::fetch(
                "account value",
                format!(
                    "vault equity overflows: {} * {}",
                    summary.vtoken_supply, summary.vtoken_price
                ),
            )
        })?;
        if equity.is_sign_negative() {
            return Err(RebalanceError::fetch(
                "account value",
                format!("negative vault equity {}", equity),
            ));
        }

        Ok(equity)
    }

    async fn get_quote(&self, instrument: &str) -> Result<MarketQuote> {
        let response = self
            .client
            .get(self.url(&format!("/bbo/{}", instrument)))
            .send()
            .await;

        let body: BboResponse = read_json(response, |e| RebalanceError::fetch("quote", e)).await?;

        Ok(body.into())
    }

    async fn cancel_all_orders(&self, session: &SessionToken) -> Result<()> {
        let response = self
            .client
            .delete(self.url("/orders"))
            .bearer_auth(session.as_str())
            .send()
            .await;

        check_status(response, &RebalanceError::Cancel).await?;
        debug!("Open orders cancelled");

        Ok(())
    }

    async fn submit_order(&self, session: &SessionToken, order: &RebalanceOrder) -> Result<()> {
        if !order.is_signed() {
            return Err(RebalanceError::Submit("order is not signed".to_string()));
        }

        info!(
            side = order.side.as_str(),
            price = %order.price,
            size = %order.size,
            client_id = %order.client_id,
            "Submitting order to {}",
            self.url("/orders")
        );

        let response = self
            .client
            .post(self.url("/orders"))
            .bearer_auth(session.as_str())
            .json(order)
            .send()
            .await;

        if let Err(e) = check_status(response, &RebalanceError::Submit).await {
            error!("Order rejected: {}", e);
            return Err(e);
        }

        Ok(())
    }
}
