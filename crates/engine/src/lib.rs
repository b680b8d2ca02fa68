//! Swingbot Engine - Two-leg trade execution and order fill waiting

pub mod executor;

pub use executor::{wait_for_fill, ExecutionReport, ExecutorConfig, TradeExecutor, WaitPolicy};
