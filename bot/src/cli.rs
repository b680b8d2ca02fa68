//! Command line surface

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use swingbot_core::{Result, Trade, TradeDirection, DEFAULT_CURRENCY, DEFAULT_PERCENT_CHANGE};

#[derive(Debug, Parser)]
#[command(name = "swingbot", version, about = "Two-leg limit order trading bot")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "swingbot.toml")]
    pub config: PathBuf,

    /// Use the in-memory paper exchange
    #[arg(long)]
    pub paper: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Long,
    Short,
}

impl From<DirectionArg> for TradeDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Long => TradeDirection::Long,
            DirectionArg::Short => TradeDirection::Short,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a trade and follow it through both legs
    Trade {
        #[arg(value_enum)]
        direction: DirectionArg,
        /// Base asset, e.g. BTC
        #[arg(long)]
        symbol: String,
        /// Quantity of the base asset
        #[arg(long)]
        amount: f64,
        /// Price of the opening leg
        #[arg(long)]
        price: f64,
        /// Target move: a fraction for long trades, a percentage for short ones
        #[arg(long, default_value_t = DEFAULT_PERCENT_CHANGE)]
        percent: f64,
        /// Quote currency
        #[arg(long, default_value = DEFAULT_CURRENCY)]
        currency: String,
    },
    /// List open orders
    Orders {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Cancel an order
    Cancel { order_id: String },
    /// Show the available balance
    Balance,
}

impl Command {
    /// Build the trade described by a `trade` command
    pub fn to_trade(&self) -> Option<Result<Trade>> {
        match self {
            Command::Trade {
                direction,
                symbol,
                amount,
                price,
                percent,
                currency,
            } => Some(Trade::new(
                (*direction).into(),
                *price,
                symbol,
                *amount,
                *percent,
                currency,
            )),
            _ => None,
        }
    }
}
