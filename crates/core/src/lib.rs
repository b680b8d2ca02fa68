//! Swingbot Core - Trade models, exchange gateway capability, and errors

pub mod errors;
pub mod gateway;
pub mod models;
pub mod types;

pub use errors::{Error, Result};
pub use gateway::ExchangeGateway;
pub use models::*;
pub use types::*;
