//! # models::account
//!
//! Defines the broker-side snapshot types the Survival Risk Engine reads:
//! [`AccountSnapshot`], open [`Position`]s and per-symbol [`AssetSpecs`].
//!
//! All of these mirror what the MT5 terminal reports (`account_info()`,
//! `positions_get()`, `symbol_info()`), already normalised by the bridge.

use serde::{Deserialize, Serialize};

// ─── Direction ────────────────────────────────────────────────────────────────

/// ฝั่งของ Position — Long (Buy) หรือ Short (Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[serde(alias = "BUY", alias = "long", alias = "buy")]
    Long,
    #[serde(alias = "SELL", alias = "short", alias = "sell")]
    Short,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LONG" | "BUY"   => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            other => Err(format!("Unknown direction '{other}'. Use LONG/BUY or SHORT/SELL")),
        }
    }
}

// ─── Position ─────────────────────────────────────────────────────────────────

/// Position ที่เปิดอยู่จริงใน MT5 ณ ตอนที่ถ่าย Snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticket: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub lots: f64,
    pub entry_price: f64,
    pub current_price: f64,
    /// `None` = ไม่ได้ตั้ง SL (MT5 รายงานเป็น 0.0)
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub profit: f64,
}

impl Position {
    /// Price distance lost if the stop is hit from the current price.
    ///
    /// Negative when the stop already locks in profit. `None` for a position
    /// without a stop.
    pub fn loss_distance(&self) -> Option<f64> {
        let stop = self.stop_loss?;
        Some(match self.direction {
            Direction::Long  => self.current_price - stop,
            Direction::Short => stop - self.current_price,
        })
    }
}

// ─── AccountSnapshot ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    #[serde(default)]
    pub floating_pl: f64,
    pub used_margin: f64,
    #[serde(default)]
    pub free_margin: f64,
    #[serde(default)]
    pub positions_count: u32,
    /// Leverage ของบัญชี เช่น 500 = 1:500
    pub leverage_account: f64,
}

// ─── AssetSpecs ───────────────────────────────────────────────────────────────

/// Per-instrument economics as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpecs {
    pub leverage: f64,
    /// Units per 1.0 lot, e.g. 100 for XAUUSD, 100_000 for EURUSD.
    pub contract_size: f64,
    #[serde(default)]
    pub tick_value: f64,
    #[serde(default = "default_min_lot")]
    pub min_lot: f64,
    #[serde(default = "default_max_lot")]
    pub max_lot: f64,
    #[serde(default = "default_min_lot")]
    pub step_lot: f64,
    #[serde(default)]
    pub margin_min: f64,
    #[serde(default)]
    pub digits: u32,
}

fn default_min_lot() -> f64 { 0.01 }
fn default_max_lot() -> f64 { 100.0 }

impl AssetSpecs {
    /// Symbol leverage can never exceed what the account itself allows.
    pub fn capped_by(mut self, account_leverage: f64) -> Self {
        if account_leverage > 0.0 && (self.leverage <= 0.0 || self.leverage > account_leverage) {
            self.leverage = account_leverage;
        }
        self
    }
}
