//! Shared type definitions

use std::collections::BTreeMap;

/// Available amount per asset ticker
pub type FreeBalance = BTreeMap<String, f64>;

/// Keep only assets with a strictly positive available amount
pub fn positive_balances<I>(balances: I) -> FreeBalance
where
    I: IntoIterator<Item = (String, f64)>,
{
    balances
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .collect()
}
