//! HTTP transport and the Bitfinex REST adapter

mod bitfinex;
mod client;

pub use bitfinex::{from_exchange_symbol, parse_status, to_exchange_symbol};
pub use client::{BitfinexClient, Credentials, DEFAULT_BASE_URL, DEFAULT_PUBLIC_URL};
