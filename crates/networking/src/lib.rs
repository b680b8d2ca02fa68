//! Swingbot Networking - Exchange API clients and the gateway adapter

pub mod api;
pub mod http;
pub mod paper;

pub use api::{CryptoExchange, ExchangeApi};
pub use http::{BitfinexClient, Credentials};
pub use paper::{PaperConfig, PaperExchange};
