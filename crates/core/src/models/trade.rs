//! Trade models: a directional two-leg bet and its exit price

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Target move used when the caller does not supply one
pub const DEFAULT_PERCENT_CHANGE: f64 = 0.5;

/// Quote currency used when the caller does not supply one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Buy first, sell higher
    Long,
    /// Sell first, buy back lower
    Short,
}

impl TradeDirection {
    /// Exit price for a position opened at `start_price`.
    ///
    /// Long reads `percent_change` as a fraction (0.5 = +50%), Short reads it
    /// as a percentage (50 = -50%).
    pub fn exit_price(self, start_price: f64, percent_change: f64) -> f64 {
        match self {
            TradeDirection::Long => start_price * (1.0 + percent_change),
            TradeDirection::Short => start_price * (1.0 - percent_change / 100.0),
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => f.write_str("Long"),
            TradeDirection::Short => f.write_str("Short"),
        }
    }
}

/// Fields shared by every trade direction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDetails {
    start_price: f64,
    symbol: String,
    amount: f64,
    currency: String,
    exit_price: f64,
}

impl TradeDetails {
    /// Price the opening leg is placed at
    pub fn start_price(&self) -> f64 {
        self.start_price
    }

    /// Base asset ticker, always uppercase
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Quantity of the base asset traded on both legs
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Quote asset ticker
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Price the closing leg is placed at
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Market symbol as the exchange expects it, e.g. `BTC/USD`
    pub fn exchange_symbol(&self) -> String {
        format!("{}/{}", self.symbol, self.currency)
    }
}

/// A directional bet, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum Trade {
    Long(TradeDetails),
    Short(TradeDetails),
}

impl Trade {
    /// Build a trade, computing its exit price from `percent_change`.
    ///
    /// # Errors
    /// [`Error::InvalidTradeParameters`] when `start_price` or `amount` is not
    /// strictly positive, when the symbol or currency is blank, or when the
    /// resulting exit price is not a positive number.
    pub fn new(
        direction: TradeDirection,
        start_price: f64,
        symbol: &str,
        amount: f64,
        percent_change: f64,
        currency: &str,
    ) -> Result<Self> {
        if !(start_price.is_finite() && start_price > 0.0) {
            return Err(Error::InvalidTradeParameters(format!(
                "start price must be positive, got {}",
                start_price
            )));
        }
        if !(amount.is_finite() && amount > 0.0) {
            return Err(Error::InvalidTradeParameters(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidTradeParameters("symbol is empty".to_string()));
        }
        let currency = currency.trim();
        if currency.is_empty() {
            return Err(Error::InvalidTradeParameters("currency is empty".to_string()));
        }

        let exit_price = direction.exit_price(start_price, percent_change);
        if !(exit_price.is_finite() && exit_price > 0.0) {
            return Err(Error::InvalidTradeParameters(format!(
                "{} trade from {} with change {} has no valid exit price ({})",
                direction, start_price, percent_change, exit_price
            )));
        }

        let details = TradeDetails {
            start_price,
            symbol,
            amount,
            currency: currency.to_string(),
            exit_price,
        };

        Ok(match direction {
            TradeDirection::Long => Trade::Long(details),
            TradeDirection::Short => Trade::Short(details),
        })
    }

    /// Long trade quoted in the default currency
    pub fn long(start_price: f64, symbol: &str, amount: f64, percent_change: f64) -> Result<Self> {
        Self::new(
            TradeDirection::Long,
            start_price,
            symbol,
            amount,
            percent_change,
            DEFAULT_CURRENCY,
        )
    }

    /// Short trade quoted in the default currency
    pub fn short(start_price: f64, symbol: &str, amount: f64, percent_change: f64) -> Result<Self> {
        Self::new(
            TradeDirection::Short,
            start_price,
            symbol,
            amount,
            percent_change,
            DEFAULT_CURRENCY,
        )
    }

    pub fn direction(&self) -> TradeDirection {
        match self {
            Trade::Long(_) => TradeDirection::Long,
            Trade::Short(_) => TradeDirection::Short,
        }
    }

    pub fn details(&self) -> &TradeDetails {
        match self {
            Trade::Long(details) | Trade::Short(details) => details,
        }
    }

    pub fn start_price(&self) -> f64 {
        self.details().start_price()
    }

    pub fn exit_price(&self) -> f64 {
        self.details().exit_price()
    }

    pub fn amount(&self) -> f64 {
        self.details().amount()
    }

    pub fn symbol(&self) -> &str {
        self.details().symbol()
    }

    pub fn currency(&self) -> &str {
        self.details().currency()
    }

    pub fn exchange_symbol(&self) -> String {
        self.details().exchange_symbol()
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self.details();
        write!(
            f,
            "{} order for {} {} with either price: {}, exit_price: {}",
            self.direction(),
            details.amount,
            details.exchange_symbol(),
            significant(details.start_price, PRICE_DIGITS),
            significant(details.exit_price, PRICE_DIGITS)
        )
    }
}

/// Significant digits shown for prices
const PRICE_DIGITS: i32 = 5;

/// Round to `digits` significant digits in fixed notation, keeping at least
/// one decimal place (`100.0`, `1234.6`, `0.00012346`)
fn significant(value: f64, digits: i32) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{:.1}", value);
    }

    let magnitude = value.abs().log10().floor() as i32;
    let decimals = digits - 1 - magnitude;
    let mut text = if decimals >= 0 {
        format!("{:.*}", decimals as usize, value)
    } else {
        let scale = 10f64.powi(-decimals);
        format!("{:.0}", (value / scale).round() * scale)
    };

    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').len();
        text.truncate(trimmed);
        if text.ends_with('.') {
            text.push('0');
        }
    } else {
        text.push_str(".0");
    }
    text
}
