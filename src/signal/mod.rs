pub mod http;

pub use http::{parse_target, HttpCsvSignal};

use crate::data::ExposureTarget;
use crate::error::Result;
use async_trait::async_trait;

/// Source of the target exposure fraction, polled once per cycle
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn latest_target(&self) -> Result<ExposureTarget>;
}
