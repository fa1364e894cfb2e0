pub mod client;
pub mod http;

pub use client::{Credentials, ExchangeClient, SessionToken};
pub use http::RestExchangeClient;
