use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Everything that can abort a rebalance cycle
#[derive(Debug, thiserror::Error)]
pub enum RebalanceError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to fetch {what}: {reason}")]
    Fetch { what: &'static str, reason: String },

    #[error("cancel-all failed: {0}")]
    Cancel(String),

    #[error("order submission failed: {0}")]
    Submit(String),

    #[error("signal unavailable: {0}")]
    SignalUnavailable(String),

    #[error("invalid quote: bid {bid}, ask {ask}")]
    InvalidQuote { bid: Decimal, ask: Decimal },

    #[error("computation error: {0}")]
    Computation(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// How long the driver should wait before the next attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Likely to clear on the next cycle (network blips, rejected orders)
    Transient,
    /// Needs operator attention or an upstream recovery
    Persistent,
}

impl RebalanceError {
    pub fn fetch(what: &'static str, reason: impl ToString) -> Self {
        Self::Fetch {
            what,
            reason: reason.to_string(),
        }
    }

    /// Short label used for logs and the failure counter
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Fetch { .. } => "fetch",
            Self::Cancel(_) => "cancel",
            Self::Submit(_) => "submit",
            Self::SignalUnavailable(_) => "signal_unavailable",
            Self::InvalidQuote { .. } => "invalid_quote",
            Self::Computation(_) => "computation",
            Self::Timeout { .. } => "timeout",
            Self::Config(_) | Self::ConfigRead { .. } | Self::ConfigParse(_) => "config",
            Self::Metrics(_) => "metrics",
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            Self::Auth(_)
            | Self::SignalUnavailable(_)
            | Self::Config(_)
            | Self::ConfigRead { .. }
            | Self::ConfigParse(_) => FailureClass::Persistent,
            _ => FailureClass::Transient,
        }
    }
}

pub type Result<T> = std::result::Result<T, RebalanceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_classification() {
        assert_eq!(RebalanceError::Auth("401".into()).class(), FailureClass::Persistent);
        assert_eq!(
            RebalanceError::SignalUnavailable("404".into()).class(),
            FailureClass::Persistent
        );
        assert_eq!(RebalanceError::fetch("quote", "502").class(), FailureClass::Transient);
        assert_eq!(
            RebalanceError::InvalidQuote { bid: dec!(0), ask: dec!(1) }.class(),
            FailureClass::Transient
        );
        assert_eq!(
            RebalanceError::Timeout { operation: "get_quote", after: Duration::from_secs(1) }.class(),
            FailureClass::Transient
        );
    }

    #[test]
    fn test_display_carries_context() {
        let err = RebalanceError::fetch("positions", "HTTP 503");
        assert_eq!(err.to_string(), "failed to fetch positions: HTTP 503");
        assert_eq!(err.kind(), "fetch");
    }
}
