//! Exchange gateway adapter over a raw exchange API

use super::ExchangeApi;
use async_trait::async_trait;
use std::collections::BTreeSet;
use swingbot_core::{
    positive_balances, Error, ExchangeGateway, FreeBalance, Order, OrderSide, Result,
};
use tracing::{debug, info, instrument, warn};

/// Exchange account used by the trade engine.
///
/// Loads the market list once on [`CryptoExchange::connect`] and rejects
/// orders for unknown markets before they reach the exchange.
pub struct CryptoExchange<A> {
    api: A,
    markets: BTreeSet<String>,
}

impl<A: ExchangeApi> CryptoExchange<A> {
    /// Wrap `api`, loading its markets
    pub async fn connect(api: A) -> Result<Self> {
        let markets: BTreeSet<String> = api
            .load_markets()
            .await?
            .into_iter()
            .map(|m| m.to_uppercase())
            .collect();

        info!("Exchange connected with {} markets", markets.len());
        Ok(Self { api, markets })
    }

    fn ensure_market(&self, symbol: &str) -> Result<()> {
        if self.markets.contains(&symbol.to_uppercase()) {
            Ok(())
        } else {
            Err(Error::InvalidData(format!("Unknown market {}", symbol)))
        }
    }

    async fn place(&self, symbol: &str, side: OrderSide, amount: f64, price: f64) -> Result<Order> {
        self.ensure_market(symbol)?;
        let order = self.api.create_order(symbol, side, amount, price).await?;
        debug!("Placed {} order {} on {}", side, order.id, symbol);
        Ok(order)
    }
}

#[async_trait]
impl<A: ExchangeApi> ExchangeGateway for CryptoExchange<A> {
    #[instrument(skip(self))]
    async fn place_sell_order(&self, symbol: &str, amount: f64, price: f64) -> Result<Order> {
        self.place(symbol, OrderSide::Sell, amount, price).await
    }

    #[instrument(skip(self))]
    async fn place_buy_order(&self, symbol: &str, amount: f64, price: f64) -> Result<Order> {
        self.place(symbol, OrderSide::Buy, amount, price).await
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        self.api.fetch_order(order_id).await
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        match self.api.cancel_order(order_id).await {
            Ok(()) => {
                info!("Canceled order {}", order_id);
                Ok(())
            }
            Err(Error::OrderNotFound(msg)) => {
                warn!("Order {} already gone: {}", order_id, msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        self.api.fetch_open_orders(symbol).await
    }

    async fn fetch_free_balance(&self) -> Result<FreeBalance> {
        Ok(positive_balances(self.api.fetch_balance().await?))
    }
}
