//! Swingbot - two-leg limit order trading from the command line

mod cli;
mod config;
mod format;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use config::AppConfig;
use std::sync::Arc;
use swingbot_core::ExchangeGateway;
use swingbot_engine::TradeExecutor;
use swingbot_networking::{BitfinexClient, CryptoExchange, PaperExchange};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "swingbot=info,swingbot_engine=info,swingbot_networking=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let mut config = AppConfig::load(&cli.config)?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    if cli.paper {
        config.exchange.paper = true;
    }
    config.validate()?;

    let gateway = connect(&config).await?;

    match cli.command {
        ref command @ Command::Trade { .. } => {
            let trade = command
                .to_trade()
                .context("not a trade command")?
                .context("Invalid trade")?;
            run_trade(gateway, &config, trade).await?;
        }
        Command::Orders { symbol } => {
            let orders = gateway.fetch_open_orders(symbol.as_deref()).await?;
            println!("{}", format::format_open_orders(&orders));
        }
        Command::Cancel { order_id } => {
            gateway.cancel_order(&order_id).await?;
            println!("Order {} canceled", order_id);
        }
        Command::Balance => {
            let balance = gateway.fetch_free_balance().await?;
            println!("{}", format::format_balance(&balance));
        }
    }

    Ok(())
}

/// Build the exchange gateway selected by the config
async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn ExchangeGateway>> {
    if config.exchange.paper {
        tracing::info!("Using paper exchange");
        let exchange = CryptoExchange::connect(PaperExchange::new(config.paper.clone())).await?;
        return Ok(Arc::new(exchange));
    }

    let client = BitfinexClient::with_base_urls(
        config.exchange.credentials(),
        &config.exchange.base_url,
        &config.exchange.public_url,
    )?;
    let exchange = CryptoExchange::connect(client)
        .await
        .context("Failed to load exchange markets")?;
    Ok(Arc::new(exchange))
}

async fn run_trade(
    gateway: Arc<dyn ExchangeGateway>,
    config: &AppConfig,
    trade: swingbot_core::Trade,
) -> anyhow::Result<()> {
    let executor = TradeExecutor::new(gateway, &config.executor);
    println!("{}", trade);

    // Ctrl-C abandons the current wait; open orders stay on the exchange
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, no longer waiting for fills");
            on_signal.cancel();
        }
    });

    match executor.execute_with_cancel(&trade, &cancel).await {
        Ok(report) => {
            println!("{}", format::format_report(&report));
            Ok(())
        }
        Err(e) => {
            tracing::error!("Trade failed: {} ({})", e, e.root_cause());
            Err(e.into())
        }
    }
}
