//! Paper exchange: an in-memory order book for dry runs
//!
//! Orders never match against a real market. Each open order fills after
//! it has been polled `fill_after_polls` times, which is enough to drive the
//! trade engine end to end without touching live funds.

use crate::api::ExchangeApi;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use swingbot_core::{Error, Order, OrderSide, OrderStatus, Result};
use tracing::{debug, info};

/// Configuration for the paper exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Status reads an open order survives before it fills
    #[serde(default = "default_fill_after_polls")]
    pub fill_after_polls: u32,
    /// Tradable markets, as `BASE/QUOTE`
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    /// Starting balances per asset
    #[serde(default = "default_balances")]
    pub balances: BTreeMap<String, f64>,
}

fn default_fill_after_polls() -> u32 { 2 }

fn default_markets() -> Vec<String> {
    ["BTC/USD", "ETH/USD", "LTC/USD", "XRP/USD"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_balances() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("USD".to_string(), 100_000.0),
        ("BTC".to_string(), 2.0),
        ("ETH".to_string(), 20.0),
    ])
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            fill_after_polls: default_fill_after_polls(),
            markets: default_markets(),
            balances: default_balances(),
        }
    }
}

struct PaperOrder {
    order: Order,
    polls: u32,
}

struct PaperState {
    next_id: u64,
    orders: BTreeMap<u64, PaperOrder>,
    balances: BTreeMap<String, f64>,
}

/// Simulated exchange account
pub struct PaperExchange {
    config: PaperConfig,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(config: PaperConfig) -> Self {
        let balances = config.balances.clone();
        Self {
            config,
            state: Mutex::new(PaperState {
                next_id: 1,
                orders: BTreeMap::new(),
                balances,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PaperState>> {
        self.state
            .lock()
            .map_err(|_| Error::ApiError("paper exchange state poisoned".to_string()))
    }
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new(PaperConfig::default())
    }
}

/// Split `BASE/QUOTE`
fn split_symbol(symbol: &str) -> Result<(&str, &str)> {
    symbol
        .split_once('/')
        .ok_or_else(|| Error::InvalidData(format!("Symbol {} is not BASE/QUOTE", symbol)))
}

fn parse_id(order_id: &str) -> Result<u64> {
    order_id
        .parse()
        .map_err(|_| Error::OrderNotFound(order_id.to_string()))
}

impl PaperState {
    fn credit(&mut self, asset: &str, amount: f64) {
        *self.balances.entry(asset.to_string()).or_insert(0.0) += amount;
    }

    /// Asset and amount an order locks while it is open
    fn reserved(order: &Order) -> Result<(String, f64)> {
        let (base, quote) = split_symbol(&order.symbol)?;
        Ok(match order.side {
            OrderSide::Sell => (base.to_string(), order.amount),
            OrderSide::Buy => (quote.to_string(), order.amount * order.price),
        })
    }

    /// Asset and amount an order pays out when it fills
    fn proceeds(order: &Order) -> Result<(String, f64)> {
        let (base, quote) = split_symbol(&order.symbol)?;
        Ok(match order.side {
            OrderSide::Sell => (quote.to_string(), order.amount * order.price),
            OrderSide::Buy => (base.to_string(), order.amount),
        })
    }
}

#[async_trait]
impl ExchangeApi for PaperExchange {
    async fn load_markets(&self) -> Result<Vec<String>> {
        Ok(self.config.markets.clone())
    }

    async fn create_order(&self, symbol: &str, side: OrderSide, amount: f64, price: f64) -> Result<Order> {
        if !(amount > 0.0 && price > 0.0) {
            return Err(Error::ApiError(format!(
                "Invalid order: amount {} price {}",
                amount, price
            )));
        }

        let mut state = self.lock()?;
        let id = state.next_id;

        let order = Order {
            id: id.to_string(),
            symbol: symbol.to_string(),
            side,
            status: OrderStatus::Open,
            price,
            amount,
            filled: 0.0,
            timestamp: Some(chrono::Utc::now()),
        };

        let (asset, needed) = PaperState::reserved(&order)?;
        let available = state.balances.get(&asset).copied().unwrap_or(0.0);
        if available < needed {
            return Err(Error::ApiError(format!(
                "Invalid order: not enough {} balance ({} < {})",
                asset, available, needed
            )));
        }
        state.credit(&asset, -needed);

        state.next_id += 1;
        state.orders.insert(
            id,
            PaperOrder {
                order: order.clone(),
                polls: 0,
            },
        );

        info!("Paper {} order {} for {} {} at {}", side, id, amount, symbol, price);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let id = parse_id(order_id)?;
        let mut state = self.lock()?;
        let fill_after = self.config.fill_after_polls;

        let entry = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;

        if entry.order.status != OrderStatus::Open {
            return Ok(entry.order.clone());
        }

        entry.polls += 1;
        if entry.polls <= fill_after {
            debug!("Paper order {} still open ({}/{})", id, entry.polls, fill_after);
            return Ok(entry.order.clone());
        }

        entry.order.status = OrderStatus::Closed;
        entry.order.filled = entry.order.amount;
        let filled = entry.order.clone();

        let (asset, amount) = PaperState::proceeds(&filled)?;
        state.credit(&asset, amount);

        info!("Paper order {} filled", id);
        Ok(filled)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let id = parse_id(order_id)?;
        let mut state = self.lock()?;

        let entry = state
            .orders
            .get_mut(&id)
            .filter(|entry| entry.order.is_open())
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;

        entry.order.status = OrderStatus::Canceled;
        let canceled = entry.order.clone();

        let (asset, amount) = PaperState::reserved(&canceled)?;
        state.credit(&asset, amount);

        info!("Paper order {} canceled", id);
        Ok(())
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let state = self.lock()?;
        Ok(state
            .orders
            .values()
            .map(|entry| &entry.order)
            .filter(|order| order.is_open())
            .filter(|order| symbol.map_or(true, |s| order.symbol.eq_ignore_ascii_case(s.trim())))
            .cloned()
            .collect())
    }

    async fn fetch_balance(&self) -> Result<Vec<(String, f64)>> {
        let state = self.lock()?;
        Ok(state
            .balances
            .iter()
            .map(|(asset, amount)| (asset.clone(), *amount))
            .collect())
    }
}
