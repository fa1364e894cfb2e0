use crate::data::ExposureTarget;
use crate::error::{RebalanceError, Result};
use crate::signal::SignalSource;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Signal published as a CSV document over HTTP.
///
/// The first line is a header; the newest target is in the last data row.
pub struct HttpCsvSignal {
    client: Client,
    endpoint: String,
    target_column: usize,
}

impl HttpCsvSignal {
    pub fn new(endpoint: impl Into<String>, target_column: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RebalanceError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            target_column,
        })
    }
}

#[async_trait]
impl SignalSource for HttpCsvSignal {
    async fn latest_target(&self) -> Result<ExposureTarget> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| RebalanceError::SignalUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RebalanceError::SignalUnavailable(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RebalanceError::SignalUnavailable(e.to_string()))?;

        let target = parse_target(&body, self.target_column)?;
        debug!(%target, "Signal polled");

        Ok(target)
    }
}

/// Extract the target from the last non-empty data row of a CSV document
pub fn parse_target(csv: &str, column: usize) -> Result<ExposureTarget> {
    let row = csv
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .ok_or_else(|| RebalanceError::SignalUnavailable("signal has no data rows".to_string()))?;

    let field = row.split(',').nth(column).map(str::trim).ok_or_else(|| {
        RebalanceError::Computation(format!("signal row '{}' has no column {}", row, column))
    })?;

    let field = field.trim_matches('"');
    Decimal::from_str(field)
        .or_else(|_| Decimal::from_scientific(field))
        .map_err(|e| RebalanceError::Computation(format!("malformed target '{}': {}", field, e)))
}
