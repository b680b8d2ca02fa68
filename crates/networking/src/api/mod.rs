//! Raw exchange API and the gateway adapter built on top of it
//!
//! [`ExchangeApi`] is the thin request/response surface an exchange (or the
//! paper simulator) offers. [`CryptoExchange`] adds the behaviour the trade
//! engine relies on: market validation, idempotent cancellation and
//! zero-balance filtering.

mod exchange;

pub use exchange::CryptoExchange;

use async_trait::async_trait;
use swingbot_core::{Order, OrderSide, Result};

/// Raw exchange operations, one request each
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Markets tradable on the exchange, as `BASE/QUOTE`
    async fn load_markets(&self) -> Result<Vec<String>>;

    /// Place a limit order
    async fn create_order(&self, symbol: &str, side: OrderSide, amount: f64, price: f64) -> Result<Order>;

    /// Fetch one order, open or finished. `OrderNotFound` if unknown.
    async fn fetch_order(&self, order_id: &str) -> Result<Order>;

    /// Cancel an order. `OrderNotFound` if it is unknown or already finished.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Open orders, optionally for a single market
    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>>;

    /// Available amount per asset, empty wallets included
    async fn fetch_balance(&self) -> Result<Vec<(String, f64)>>;
}
