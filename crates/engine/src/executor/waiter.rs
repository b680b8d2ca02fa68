//! Fill waiter: poll an order until the exchange reports a terminal state

use super::config::WaitPolicy;
use swingbot_core::{Error, ExchangeGateway, Order, OrderStatus, Result};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Wait for `order_id` to reach `Closed`.
///
/// Sleeps `check_interval` before every status read. Non-terminal statuses,
/// including ones we do not model, keep the loop going.
///
/// # Errors
/// * [`Error::ExchangeError`] when the order is canceled on the exchange
/// * [`Error::WaitTimedOut`] when `max_wait` elapses first
/// * [`Error::WaitCancelled`] when `cancel` fires
/// * any gateway error from the status read, unchanged
pub async fn wait_for_fill(
    gateway: &dyn ExchangeGateway,
    order_id: &str,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<Order> {
    let started = Instant::now();
    let deadline = policy.max_wait.map(|max_wait| started + max_wait);
    let mut polls: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Stopped waiting for order {} after {} polls", order_id, polls);
                return Err(Error::WaitCancelled {
                    order_id: order_id.to_string(),
                });
            }
            _ = wait_deadline(deadline) => {
                let waited = started.elapsed();
                warn!("Order {} still open after {:?}, giving up", order_id, waited);
                return Err(Error::WaitTimedOut {
                    order_id: order_id.to_string(),
                    waited,
                });
            }
            _ = sleep(policy.check_interval) => {}
        }

        let order = gateway.fetch_order(order_id).await?;
        polls += 1;

        match order.status {
            OrderStatus::Closed => {
                info!("Finished order {} with status {}", order_id, order.status);
                return Ok(order);
            }
            OrderStatus::Canceled => {
                info!("Finished order {} with status {}", order_id, order.status);
                return Err(Error::ExchangeError("Trade has been canceled".to_string()));
            }
            ref status => {
                debug!(
                    "Order {} is {} (poll {}, filled {}/{})",
                    order_id, status, polls, order.filled, order.amount
                );
            }
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedGateway;
    use std::time::Duration;

    const INTERVAL: Duration = Duration::from_secs(15);

    fn open_then_closed(open_polls: usize) -> Vec<OrderStatus> {
        let mut statuses = vec![OrderStatus::Open; open_polls];
        statuses.push(OrderStatus::Closed);
        statuses
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_once_per_interval_until_closed() {
        for open_polls in [0usize, 1, 4] {
            let gateway = ScriptedGateway::with_order("7", open_then_closed(open_polls));
            let started = Instant::now();

            let order = wait_for_fill(
                &gateway,
                "7",
                &WaitPolicy::new(INTERVAL),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

            assert_eq!(order.status, OrderStatus::Closed);
            assert_eq!(gateway.fetch_count(), open_polls + 1);
            for (i, at) in gateway.fetch_times().into_iter().enumerate() {
                assert_eq!(at - started, INTERVAL * (i as u32 + 1));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_polling() {
        let gateway = ScriptedGateway::with_order(
            "7",
            vec![
                OrderStatus::Open,
                OrderStatus::Other("partially_filled".to_string()),
                OrderStatus::Closed,
            ],
        );

        let order = wait_for_fill(&gateway, "7", &WaitPolicy::new(INTERVAL), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Closed);
        assert_eq!(gateway.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_order_fails_without_further_polls() {
        let gateway = ScriptedGateway::with_order(
            "7",
            vec![OrderStatus::Open, OrderStatus::Canceled, OrderStatus::Closed],
        );

        let err = wait_for_fill(&gateway, "7", &WaitPolicy::new(INTERVAL), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ExchangeError(ref msg) if msg == "Trade has been canceled"));
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_error_propagates() {
        let gateway = ScriptedGateway::with_order("7", Vec::new());

        let err = wait_for_fill(&gateway, "7", &WaitPolicy::new(INTERVAL), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NetworkError(_)));
        assert_eq!(gateway.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_waiting() {
        let gateway = ScriptedGateway::with_order("7", vec![OrderStatus::Open]);
        let policy = WaitPolicy::new(INTERVAL).with_max_wait(Duration::from_secs(40));

        let err = wait_for_fill(&gateway, "7", &policy, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::WaitTimedOut { order_id, waited } => {
                assert_eq!(order_id, "7");
                assert_eq!(waited, Duration::from_secs(40));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_token_stops_waiting() {
        let gateway = ScriptedGateway::with_order("7", vec![OrderStatus::Open]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(50)).await;
            trigger.cancel();
        });

        let err = wait_for_fill(&gateway, "7", &WaitPolicy::new(INTERVAL), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::WaitCancelled { ref order_id } if order_id == "7"));
        assert_eq!(gateway.fetch_count(), 3);
    }
}
