pub mod data;
pub mod driver;
pub mod error;
pub mod exchange;
pub mod signal;
pub mod strategy;
pub mod utils;

// Re-export commonly used types
pub use data::{AccountState, ExposureTarget, MarketQuote, PositionEntry, Side};
pub use driver::{CycleDriver, CycleMetrics, CycleOutcome, DriverConfig};
pub use error::{FailureClass, RebalanceError, Result};
pub use exchange::{Credentials, ExchangeClient, RestExchangeClient, SessionToken};
pub use signal::{HttpCsvSignal, SignalSource};
pub use strategy::{
    build_order, build_signed_order, compute_rebalance, sign, RebalanceDecision, RebalanceOrder,
    RebalanceParams,
};
pub use utils::Config;
