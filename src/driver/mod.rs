pub mod cycle;
pub mod metrics;

pub use cycle::{CycleDriver, CycleInputs, CycleOutcome, DriverConfig};
pub use metrics::CycleMetrics;
