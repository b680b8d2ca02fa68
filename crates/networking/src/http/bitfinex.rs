//! Bitfinex wire format: symbols, order arrays, wallets

use super::client::BitfinexClient;
use crate::api::ExchangeApi;
use async_trait::async_trait;
use serde_json::{json, Value};
use swingbot_core::{Error, Order, OrderSide, OrderStatus, Result};
use tracing::{debug, info, instrument};

const ORDER_TYPE: &str = "EXCHANGE LIMIT";
const WALLET_TYPE: &str = "exchange";

// Field positions inside an order array
const ORD_ID: usize = 0;
const ORD_SYMBOL: usize = 3;
const ORD_MTS_CREATE: usize = 4;
const ORD_AMOUNT: usize = 6;
const ORD_AMOUNT_ORIG: usize = 7;
const ORD_STATUS: usize = 13;
const ORD_PRICE: usize = 16;

// Field positions inside a notification array
const NOTIFY_DATA: usize = 4;
const NOTIFY_STATUS: usize = 6;
const NOTIFY_TEXT: usize = 7;

/// `BTC/USD` -> `tBTCUSD`, `AAVE/USD` -> `tAAVE:USD`
pub fn to_exchange_symbol(symbol: &str) -> Result<String> {
    let (base, quote) = symbol
        .split_once('/')
        .ok_or_else(|| Error::InvalidData(format!("Symbol {} is not BASE/QUOTE", symbol)))?;

    if base.is_empty() || quote.is_empty() {
        return Err(Error::InvalidData(format!("Symbol {} is not BASE/QUOTE", symbol)));
    }

    let (base, quote) = (base.to_uppercase(), quote.to_uppercase());
    if base.len() == 3 && quote.len() == 3 {
        Ok(format!("t{}{}", base, quote))
    } else {
        Ok(format!("t{}:{}", base, quote))
    }
}

/// `tBTCUSD` / `BTCUSD` -> `BTC/USD`, `tAAVE:USD` -> `AAVE/USD`
pub fn from_exchange_symbol(raw: &str) -> Result<String> {
    let pair = raw.strip_prefix('t').unwrap_or(raw);

    if let Some((base, quote)) = pair.split_once(':') {
        return Ok(format!("{}/{}", base, quote));
    }
    if pair.len() == 6 && pair.is_ascii() {
        return Ok(format!("{}/{}", &pair[..3], &pair[3..]));
    }

    Err(Error::InvalidData(format!("Unrecognised market {}", raw)))
}

/// Map a Bitfinex order status (`ACTIVE`, `EXECUTED @ 107.6(-0.2)`, ...) to ours.
///
/// Orders the exchange killed (`POSTONLY CANCELED`, `INSUFFICIENT BALANCE (U1)`,
/// `RSN_DUST`, ...) count as canceled. Only the current state before any
/// `was:` history is considered.
pub fn parse_status(raw: &str) -> OrderStatus {
    let upper = raw.trim().to_uppercase();
    let current = upper.split(" WAS:").next().unwrap_or_default();
    if current.starts_with("ACTIVE") || current.starts_with("PARTIALLY FILLED") {
        OrderStatus::Open
    } else if current.starts_with("EXECUTED") {
        OrderStatus::Closed
    } else if current.contains("CANCELED")
        || current.starts_with("INSUFFICIENT")
        || current.starts_with("RSN_")
    {
        OrderStatus::Canceled
    } else {
        OrderStatus::Other(raw.to_string())
    }
}

fn field<'a>(items: &'a [Value], idx: usize, name: &str) -> Result<&'a Value> {
    items
        .get(idx)
        .ok_or_else(|| Error::InvalidData(format!("Order array has no {} field", name)))
}

fn f64_field(items: &[Value], idx: usize, name: &str) -> Result<f64> {
    field(items, idx, name)?
        .as_f64()
        .ok_or_else(|| Error::InvalidData(format!("Order field {} is not a number", name)))
}

/// Parse one order array
pub fn parse_order(value: &Value) -> Result<Order> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::InvalidData("Order is not an array".to_string()))?;

    let id = match field(items, ORD_ID, "id")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(Error::InvalidData(format!("Unexpected order id {}", other))),
    };
    let symbol = field(items, ORD_SYMBOL, "symbol")?
        .as_str()
        .ok_or_else(|| Error::InvalidData("Order symbol is not a string".to_string()))?;
    let remaining = f64_field(items, ORD_AMOUNT, "amount")?;
    let original = f64_field(items, ORD_AMOUNT_ORIG, "amount_orig")?;
    let status = field(items, ORD_STATUS, "status")?
        .as_str()
        .ok_or_else(|| Error::InvalidData("Order status is not a string".to_string()))?;
    let price = f64_field(items, ORD_PRICE, "price")?;
    let timestamp = items
        .get(ORD_MTS_CREATE)
        .and_then(Value::as_i64)
        .and_then(chrono::DateTime::from_timestamp_millis);

    Ok(Order {
        id,
        symbol: from_exchange_symbol(symbol)?,
        side: if original < 0.0 { OrderSide::Sell } else { OrderSide::Buy },
        status: parse_status(status),
        price,
        amount: original.abs(),
        filled: (original.abs() - remaining.abs()).max(0.0),
        timestamp,
    })
}

/// Parse an array of order arrays
pub fn parse_orders(value: &Value) -> Result<Vec<Order>> {
    value
        .as_array()
        .ok_or_else(|| Error::InvalidData("Expected an array of orders".to_string()))?
        .iter()
        .map(parse_order)
        .collect()
}

/// Unwrap a write notification, failing on an `ERROR` status
fn notification_data(value: &Value) -> Result<&Value> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::InvalidData("Notification is not an array".to_string()))?;

    let status = items.get(NOTIFY_STATUS).and_then(Value::as_str).unwrap_or("");
    if status != "SUCCESS" {
        let text = items
            .get(NOTIFY_TEXT)
            .and_then(Value::as_str)
            .unwrap_or("request rejected");
        return Err(if text.to_lowercase().contains("not found") {
            Error::OrderNotFound(text.to_string())
        } else {
            Error::ApiError(text.to_string())
        });
    }

    items
        .get(NOTIFY_DATA)
        .ok_or_else(|| Error::InvalidData("Notification carries no data".to_string()))
}

/// Parse the `[["BTCUSD", "ETHUSD", ...]]` market list
pub fn parse_markets(value: &Value) -> Result<Vec<String>> {
    let pairs = value
        .as_array()
        .and_then(|outer| outer.first())
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidData("Unexpected market list shape".to_string()))?;

    Ok(pairs
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|pair| from_exchange_symbol(pair).ok())
        .collect())
}

/// Available amounts per currency for exchange wallets
pub fn parse_wallets(value: &Value) -> Result<Vec<(String, f64)>> {
    let wallets = value
        .as_array()
        .ok_or_else(|| Error::InvalidData("Wallets response is not an array".to_string()))?;

    Ok(wallets
        .iter()
        .filter_map(Value::as_array)
        .filter(|w| w.first().and_then(Value::as_str) == Some(WALLET_TYPE))
        .filter_map(|w| {
            let currency = w.get(1)?.as_str()?.to_uppercase();
            // AVAILABLE_BALANCE is null until the wallet is recalculated
            let available = w
                .get(4)
                .and_then(Value::as_f64)
                .or_else(|| w.get(2).and_then(Value::as_f64))?;
            Some((currency, available))
        })
        .collect())
}

fn order_id_number(order_id: &str) -> Result<i64> {
    order_id
        .parse::<i64>()
        .map_err(|_| Error::InvalidData(format!("Order id {} is not numeric", order_id)))
}

#[async_trait]
impl ExchangeApi for BitfinexClient {
    #[instrument(skip(self))]
    async fn load_markets(&self) -> Result<Vec<String>> {
        let value = self.get_public("v2/conf/pub:list:pair:exchange").await?;
        let markets = parse_markets(&value)?;
        info!("Loaded {} Bitfinex markets", markets.len());
        Ok(markets)
    }

    #[instrument(skip(self))]
    async fn create_order(&self, symbol: &str, side: OrderSide, amount: f64, price: f64) -> Result<Order> {
        let signed_amount = match side {
            OrderSide::Buy => amount,
            OrderSide::Sell => -amount,
        };
        let body = json!({
            "type": ORDER_TYPE,
            "symbol": to_exchange_symbol(symbol)?,
            "amount": signed_amount.to_string(),
            "price": price.to_string(),
        });

        let value = self.post_auth("v2/auth/w/order/submit", &body).await?;
        let order = notification_data(&value)?
            .as_array()
            .and_then(|orders| orders.first())
            .ok_or_else(|| Error::InvalidData("Order submit returned no order".to_string()))
            .and_then(parse_order)?;

        debug!("Submitted {} order {} for {} {}", side, order.id, amount, symbol);
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let body = json!({ "id": [order_id_number(order_id)?] });

        let active = parse_orders(&self.post_auth("v2/auth/r/orders", &body).await?)?;
        if let Some(order) = active.into_iter().next() {
            return Ok(order);
        }

        let history = parse_orders(&self.post_auth("v2/auth/r/orders/hist", &body).await?)?;
        history
            .into_iter()
            .next()
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let body = json!({ "id": order_id_number(order_id)? });
        let value = self.post_auth("v2/auth/w/order/cancel", &body).await?;
        notification_data(&value)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let path = match symbol {
            Some(symbol) => format!("v2/auth/r/orders/{}", to_exchange_symbol(symbol)?),
            None => "v2/auth/r/orders".to_string(),
        };
        parse_orders(&self.post_auth(&path, &json!({})).await?)
    }

    #[instrument(skip(self))]
    async fn fetch_balance(&self) -> Result<Vec<(String, f64)>> {
        parse_wallets(&self.post_auth("v2/auth/r/wallets", &json!({})).await?)
    }
}
