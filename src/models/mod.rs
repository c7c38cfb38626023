//! Domain models shared across the Gapsentry service.

pub mod account;
pub mod candle;

pub use account::{AccountSnapshot, AssetSpecs, Direction, Position};
pub use candle::{Candle, Timeframe};
