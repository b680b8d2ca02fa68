//! Human-readable rendering of orders, balances and trade reports

use swingbot_core::{FreeBalance, Order};
use swingbot_engine::ExecutionReport;

pub fn format_order(order: &Order) -> String {
    format!(
        "#{} {} {} {} @ {} ({}, filled {})",
        order.id, order.side, order.amount, order.symbol, order.price, order.status, order.filled
    )
}

pub fn format_open_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No open orders".to_string();
    }

    orders
        .iter()
        .map(format_order)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_balance(balance: &FreeBalance) -> String {
    if balance.is_empty() {
        return "You don't have any available balance".to_string();
    }

    let lines: Vec<String> = balance
        .iter()
        .map(|(asset, amount)| format!("{}: {}", asset, amount))
        .collect();
    format!("Your available balance:\n{}", lines.join("\n"))
}

pub fn format_report(report: &ExecutionReport) -> String {
    format!(
        "{} trade completed\n  opened: {}\n  closed: {}",
        report.direction,
        format_order(&report.opening),
        format_order(&report.closing)
    )
}
