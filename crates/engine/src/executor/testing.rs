//! Scripted exchange gateway used by the executor tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use swingbot_core::{
    Error, ExchangeGateway, FreeBalance, Order, OrderSide, OrderStatus, Result,
};
use tokio::time::Instant;

/// An order placement seen by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub side: OrderSide,
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
}

struct ScriptedOrder {
    order: Order,
    statuses: VecDeque<OrderStatus>,
}

#[derive(Default)]
struct Inner {
    scripts: VecDeque<Vec<OrderStatus>>,
    orders: Vec<ScriptedOrder>,
    placements: Vec<Placement>,
    fetches: Vec<(String, Instant)>,
}

/// Gateway whose n-th placed order reports the n-th scripted status list,
/// one status per fetch. The last status repeats once the list runs out.
#[derive(Default)]
pub struct ScriptedGateway {
    inner: Mutex<Inner>,
}

impl ScriptedGateway {
    pub fn new(scripts: Vec<Vec<OrderStatus>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                scripts: scripts.into(),
                ..Inner::default()
            }),
        }
    }

    /// Gateway with one already-placed order following `statuses`
    pub fn with_order(order_id: &str, statuses: Vec<OrderStatus>) -> Self {
        let gateway = Self::new(Vec::new());
        gateway.inner.lock().unwrap().orders.push(ScriptedOrder {
            order: order(order_id, OrderSide::Buy, 1.0, 1.0),
            statuses: statuses.into(),
        });
        gateway
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.inner.lock().unwrap().placements.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetches.len()
    }

    pub fn fetch_count_of(&self, order_id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .fetches
            .iter()
            .filter(|(id, _)| id == order_id)
            .count()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .fetches
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    fn place(&self, side: OrderSide, symbol: &str, amount: f64, price: f64) -> Result<Order> {
        let mut inner = self.inner.lock().unwrap();
        let statuses = inner
            .scripts
            .pop_front()
            .ok_or_else(|| Error::ApiError("no scripted order left".to_string()))?;

        let id = format!("order-{}", inner.orders.len() + 1);
        let mut placed = order(&id, side, amount, price);
        placed.symbol = symbol.to_string();

        inner.placements.push(Placement {
            side,
            symbol: symbol.to_string(),
            amount,
            price,
        });
        inner.orders.push(ScriptedOrder {
            order: placed.clone(),
            statuses: statuses.into(),
        });
        Ok(placed)
    }
}

fn order(id: &str, side: OrderSide, amount: f64, price: f64) -> Order {
    Order {
        id: id.to_string(),
        symbol: String::new(),
        side,
        status: OrderStatus::Open,
        price,
        amount,
        filled: 0.0,
        timestamp: None,
    }
}

#[async_trait]
impl ExchangeGateway for ScriptedGateway {
    async fn place_sell_order(&self, symbol: &str, amount: f64, price: f64) -> Result<Order> {
        self.place(OrderSide::Sell, symbol, amount, price)
    }

    async fn place_buy_order(&self, symbol: &str, amount: f64, price: f64) -> Result<Order> {
        self.place(OrderSide::Buy, symbol, amount, price)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetches.push((order_id.to_string(), Instant::now()));

        let scripted = inner
            .orders
            .iter_mut()
            .find(|o| o.order.id == order_id)
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;

        let next = if scripted.statuses.len() > 1 {
            scripted.statuses.pop_front()
        } else {
            scripted.statuses.front().cloned()
        };
        let status = next.ok_or_else(|| Error::NetworkError("scripted fetch failure".to_string()))?;

        let mut order = scripted.order.clone();
        if status == OrderStatus::Closed {
            order.filled = order.amount;
        }
        order.status = status;
        Ok(order)
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_open_orders(&self, _symbol: Option<&str>) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn fetch_free_balance(&self) -> Result<FreeBalance> {
        Ok(FreeBalance::new())
    }
}
