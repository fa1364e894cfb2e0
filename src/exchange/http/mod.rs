pub mod auth;
pub mod rest;
pub mod types;

pub use rest::RestExchangeClient;
pub use types::*;
