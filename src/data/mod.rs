pub mod types;

pub use types::{AccountState, ExposureTarget, MarketQuote, OrderInstruction, OrderType, PositionEntry, Side};
