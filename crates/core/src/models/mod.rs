//! Data models shared by the engine and the exchange adapters

mod order;
mod trade;

pub use order::*;
pub use trade::*;
