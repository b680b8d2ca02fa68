//! Exchange gateway capability consumed by the trade engine

use crate::{FreeBalance, Order, Result};
use async_trait::async_trait;

/// Narrow view of an exchange account: place, inspect and cancel limit
/// orders and read the free balance.
///
/// Implementations must be safe to share between concurrent trade
/// executions; the engine never locks around them.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Place a limit sell order for `amount` of `symbol` (e.g. `BTC/USD`)
    async fn place_sell_order(&self, symbol: &str, amount: f64, price: f64) -> Result<Order>;

    /// Place a limit buy order for `amount` of `symbol`
    async fn place_buy_order(&self, symbol: &str, amount: f64, price: f64) -> Result<Order>;

    /// Fetch the current state of an order
    async fn fetch_order(&self, order_id: &str) -> Result<Order>;

    /// Cancel an order. Succeeds when the order no longer exists.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Orders still open, optionally restricted to one market
    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>>;

    /// Assets with a positive available amount
    async fn fetch_free_balance(&self) -> Result<FreeBalance>;
}
