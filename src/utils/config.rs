use crate::error::{RebalanceError, Result};
use crate::exchange::Credentials;
use crate::strategy::{RebalanceParams, DEFAULT_DUST_THRESHOLD, DEFAULT_SIZE_DECIMALS};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ACCOUNT_ID_ENV: &str = "VAULT_ACCOUNT_ID";
pub const ACCOUNT_KEY_ENV: &str = "VAULT_ACCOUNT_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub account: AccountConfig,
    pub signal: SignalConfig,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub instrument: String,
    pub vault_id: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

fn default_client_id() -> String {
    "rebalancer".into()
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub account_id: String,
    /// Usually supplied through the environment rather than the file
    #[serde(default)]
    pub account_key: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("account_id", &self.account_id)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub endpoint: String,
    #[serde(default = "default_target_column")]
    pub target_column: usize,
}

fn default_target_column() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    pub leverage_multiplier: Decimal,
    pub dust_threshold: Decimal,
    pub size_decimals: u32,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            leverage_multiplier: dec!(50),
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            size_decimals: DEFAULT_SIZE_DECIMALS,
        }
    }
}

impl RebalanceConfig {
    pub fn params(&self) -> RebalanceParams {
        RebalanceParams {
            leverage_multiplier: self.leverage_multiplier,
            dust_threshold: self.dust_threshold,
            size_decimals: self.size_decimals,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after a cycle that submitted an order
    pub pacing_interval_secs: u64,
    /// Wait after a cycle with nothing to do
    pub idle_interval_secs: u64,
    pub failure_backoff_secs: u64,
    /// Backoff for auth, signal and config failures
    pub persistent_failure_backoff_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pacing_interval_secs: 10,
            idle_interval_secs: 0,
            failure_backoff_secs: 5,
            persistent_failure_backoff_secs: 30,
            request_timeout_secs: 10,
        }
    }
}

impl TimingConfig {
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs(self.pacing_interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    pub fn persistent_failure_backoff(&self) -> Duration {
        Duration::from_secs(self.persistent_failure_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub api_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub output: String,
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            output: "pretty".into(),
            file_path: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| RebalanceError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load from `path`, `CONFIG_FILE`, or the default path, then apply
    /// credential overrides from the environment and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = std::env::var("CONFIG_FILE")
                    .unwrap_or_else(|_| "config/vault.toml".to_string());
                Self::from_file(path)?
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup(ACCOUNT_ID_ENV).filter(|v| !v.is_empty()) {
            self.account.account_id = id;
        }
        if let Some(key) = lookup(ACCOUNT_KEY_ENV).filter(|v| !v.is_empty()) {
            self.account.account_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RebalanceError::Config(msg));

        if self.general.instrument.trim().is_empty() {
            return invalid("general.instrument must not be empty".into());
        }
        if self.general.vault_id.trim().is_empty() {
            return invalid("general.vault_id must not be empty".into());
        }
        if self.account.account_id.is_empty() || self.account.account_key.is_empty() {
            return invalid(format!(
                "account credentials missing: set account.account_id/account_key or {}/{}",
                ACCOUNT_ID_ENV, ACCOUNT_KEY_ENV
            ));
        }
        if self.rebalance.leverage_multiplier <= Decimal::ZERO {
            return invalid(format!(
                "rebalance.leverage_multiplier must be positive, got {}",
                self.rebalance.leverage_multiplier
            ));
        }
        if self.rebalance.dust_threshold <= Decimal::ZERO {
            return invalid(format!(
                "rebalance.dust_threshold must be positive, got {}",
                self.rebalance.dust_threshold
            ));
        }
        if self.timing.request_timeout_secs == 0 {
            return invalid("timing.request_timeout_secs must be positive".into());
        }

        for (name, endpoint) in [
            ("exchange.api_endpoint", &self.exchange.api_endpoint),
            ("signal.endpoint", &self.signal.endpoint),
        ] {
            if let Err(e) = url::Url::parse(endpoint) {
                return invalid(format!("{} '{}' is not a valid URL: {}", name, endpoint, e));
            }
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.account.account_id, &self.account.account_key)
    }
}
