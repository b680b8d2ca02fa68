//! Two-leg trade executor
//!
//! Opens the first leg of a trade, waits for it to fill, then opens the
//! opposing leg at the exit price and waits for that one too.

mod config;
mod waiter;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ExecutorConfig, WaitPolicy, DEFAULT_CHECK_INTERVAL_SECS};
pub use waiter::wait_for_fill;

use std::sync::Arc;
use swingbot_core::{
    Error, ExchangeGateway, Order, OrderSide, Result, Trade, TradeDetails, TradeDirection,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Outcome of a trade whose two legs both closed
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub direction: TradeDirection,
    /// First leg, as last reported by the exchange
    pub opening: Order,
    /// Second leg, as last reported by the exchange
    pub closing: Order,
}

/// Carries trades through both legs against an exchange gateway.
///
/// Holds no per-trade state, so one executor can run any number of trades
/// concurrently.
pub struct TradeExecutor {
    gateway: Arc<dyn ExchangeGateway>,
    policy: WaitPolicy,
}

impl TradeExecutor {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, config: &ExecutorConfig) -> Self {
        Self::with_policy(gateway, config.wait_policy())
    }

    pub fn with_policy(gateway: Arc<dyn ExchangeGateway>, policy: WaitPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Execute both legs of `trade`, waiting as long as the policy allows
    pub async fn execute(&self, trade: &Trade) -> Result<ExecutionReport> {
        self.execute_with_cancel(trade, &CancellationToken::new()).await
    }

    /// Execute both legs of `trade`; firing `cancel` abandons the current wait.
    ///
    /// Abandoning a wait leaves the pending order on the exchange, and a
    /// filled first leg is never unwound.
    #[instrument(skip(self, trade, cancel), fields(direction = %trade.direction(), symbol = %trade.exchange_symbol()))]
    pub async fn execute_with_cancel(
        &self,
        trade: &Trade,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport> {
        match trade {
            Trade::Short(details) => self.execute_short_trade(details, cancel).await,
            Trade::Long(details) => self.execute_long_trade(details, cancel).await,
        }
    }

    async fn execute_short_trade(
        &self,
        trade: &TradeDetails,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport> {
        let sell_price = trade.start_price();
        let buy_price = trade.exit_price();
        let symbol = trade.exchange_symbol();
        let amount = trade.amount();

        let side = OrderSide::Sell;
        let order = self.open_leg(side, &symbol, amount, sell_price).await?;
        info!(
            "Opened sell order: {} of {}. Target sell {}, buy price {}",
            amount, symbol, sell_price, buy_price
        );
        let opening = self.wait_leg(&order, cancel).await?;

        let order = self.open_leg(side.opposite(), &symbol, amount, buy_price).await?;
        info!("Opened buy order: {} of {} at {}", amount, symbol, buy_price);
        let closing = self.wait_leg(&order, cancel).await?;

        info!(
            "Completed short trade: {} of {}. Sold at {} and bought at {}",
            amount, symbol, sell_price, buy_price
        );

        Ok(ExecutionReport {
            direction: TradeDirection::Short,
            opening,
            closing,
        })
    }

    async fn execute_long_trade(
        &self,
        trade: &TradeDetails,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport> {
        let buy_price = trade.start_price();
        let sell_price = trade.exit_price();
        let symbol = trade.exchange_symbol();
        let amount = trade.amount();

        let side = OrderSide::Buy;
        let order = self.open_leg(side, &symbol, amount, buy_price).await?;
        info!(
            "Opened long trade: {} of {}. Target buy {}, sell price {}",
            amount, symbol, buy_price, sell_price
        );
        let opening = self.wait_leg(&order, cancel).await?;

        let order = self.open_leg(side.opposite(), &symbol, amount, sell_price).await?;
        info!("Opened sell order: {} of {} at {}", amount, symbol, sell_price);
        let closing = self.wait_leg(&order, cancel).await?;

        info!(
            "Completed long trade: {} of {}. Bought at {} and sold at {}",
            amount, symbol, buy_price, sell_price
        );

        Ok(ExecutionReport {
            direction: TradeDirection::Long,
            opening,
            closing,
        })
    }

    async fn open_leg(&self, side: OrderSide, symbol: &str, amount: f64, price: f64) -> Result<Order> {
        let placed = match side {
            OrderSide::Sell => self.gateway.place_sell_order(symbol, amount, price).await,
            OrderSide::Buy => self.gateway.place_buy_order(symbol, amount, price).await,
        };

        placed.map_err(|e| {
            Error::execution_failed(
                format!("could not place {} order for {} {} at {}", side, amount, symbol, price),
                e,
            )
        })
    }

    async fn wait_leg(&self, order: &Order, cancel: &CancellationToken) -> Result<Order> {
        wait_for_fill(self.gateway.as_ref(), &order.id, &self.policy, cancel)
            .await
            .map_err(|e| {
                Error::execution_failed(
                    format!("{} order {} for {} did not fill", order.side, order.id, order.symbol),
                    e,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{Placement, ScriptedGateway};
    use std::time::Duration;
    use swingbot_core::OrderStatus;
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_secs(15);

    fn executor(gateway: &Arc<ScriptedGateway>) -> TradeExecutor {
        TradeExecutor::with_policy(gateway.clone(), WaitPolicy::new(INTERVAL))
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_trade_sells_then_buys_back_lower() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            vec![OrderStatus::Closed],
            vec![OrderStatus::Closed],
        ]));
        let trade = Trade::short(100.0, "btc", 1.0, 50.0).unwrap();

        let report = executor(&gateway).execute(&trade).await.unwrap();

        assert_eq!(report.direction, TradeDirection::Short);
        assert_eq!(
            gateway.placements(),
            vec![
                Placement { side: OrderSide::Sell, symbol: "BTC/USD".into(), amount: 1.0, price: 100.0 },
                Placement { side: OrderSide::Buy, symbol: "BTC/USD".into(), amount: 1.0, price: 50.0 },
            ]
        );
        assert_eq!(report.opening.side, OrderSide::Sell);
        assert_eq!(report.closing.side, OrderSide::Buy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_trade_buys_then_sells_higher() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            vec![OrderStatus::Closed],
            vec![OrderStatus::Closed],
        ]));
        let trade = Trade::long(100.0, "btc", 1.0, 0.5).unwrap();

        executor(&gateway).execute(&trade).await.unwrap();

        assert_eq!(
            gateway.placements(),
            vec![
                Placement { side: OrderSide::Buy, symbol: "BTC/USD".into(), amount: 1.0, price: 100.0 },
                Placement { side: OrderSide::Sell, symbol: "BTC/USD".into(), amount: 1.0, price: 150.0 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_trade_waits_for_each_leg() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            vec![OrderStatus::Open, OrderStatus::Closed],
            vec![OrderStatus::Closed],
        ]));
        let trade = Trade::long(100.0, "eth", 2.0, 0.5).unwrap();
        let started = Instant::now();

        let report = executor(&gateway).execute(&trade).await.unwrap();

        assert_eq!(report.opening.status, OrderStatus::Closed);
        assert_eq!(report.closing.status, OrderStatus::Closed);
        assert_eq!(report.opening.id, "order-1");
        assert_eq!(report.closing.id, "order-2");
        assert_eq!(gateway.fetch_count(), 3);
        assert_eq!(gateway.fetch_count_of("order-1"), 2);
        assert_eq!(gateway.fetch_count_of("order-2"), 1);
        assert_eq!(gateway.placements().len(), 2);
        assert_eq!(started.elapsed(), INTERVAL * 3);

        // Completion ends the wait; nothing is polled once the report is out
        tokio::time::sleep(INTERVAL * 4).await;
        assert_eq!(gateway.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_first_leg_never_places_second() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            vec![OrderStatus::Open, OrderStatus::Canceled],
            vec![OrderStatus::Closed],
        ]));
        let trade = Trade::long(100.0, "btc", 1.0, 0.5).unwrap();

        let err = executor(&gateway).execute(&trade).await.unwrap_err();

        assert!(matches!(err, Error::ExecutionFailed { .. }));
        assert!(matches!(err.root_cause(), Error::ExchangeError(msg) if msg.contains("canceled")));
        assert_eq!(gateway.placements().len(), 1);
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_failure_aborts_trade() {
        let gateway = Arc::new(ScriptedGateway::new(vec![vec![OrderStatus::Closed]]));
        let trade = Trade::short(100.0, "btc", 1.0, 10.0).unwrap();

        let err = executor(&gateway).execute(&trade).await.unwrap_err();

        assert!(matches!(err.root_cause(), Error::ApiError(_)));
        assert_eq!(gateway.placements().len(), 1);
        assert_eq!(gateway.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_token_abandons_second_leg_wait() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            vec![OrderStatus::Closed],
            vec![OrderStatus::Open],
        ]));
        let trade = Trade::short(100.0, "btc", 1.0, 10.0).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(100)).await;
            trigger.cancel();
        });

        let err = executor(&gateway)
            .execute_with_cancel(&trade, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err.root_cause(), Error::WaitCancelled { order_id } if order_id == "order-2"));
        assert_eq!(gateway.placements().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_trades_share_one_executor() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            vec![OrderStatus::Closed],
            vec![OrderStatus::Closed],
            vec![OrderStatus::Closed],
            vec![OrderStatus::Closed],
        ]));
        let executor = executor(&gateway);
        let long = Trade::long(10.0, "xrp", 3.0, 0.5).unwrap();
        let short = Trade::short(10.0, "ltc", 3.0, 5.0).unwrap();

        let (a, b) = tokio::join!(executor.execute(&long), executor.execute(&short));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(gateway.placements().len(), 4);
    }
}
