//! # models::candle
//!
//! แท่งเทียน OHLC ที่ส่งเข้ามาวิเคราะห์ Fair Value Gap
//!
//! The candle source (MT5 bridge or the request body) is responsible for
//! resampling and de-duplication. The detector only requires that a series can
//! be ordered by `time`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// เวลาเปิดของแท่งเทียน (UTC)
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self { time, open, high, low, close }
    }

    /// Open time as whole unix seconds, whatever resolution the source used.
    #[inline]
    pub fn unix_secs(&self) -> i64 {
        self.time.timestamp()
    }
}

// ─── Timeframe ────────────────────────────────────────────────────────────────

/// Bar size requested from a candle source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Timeframe::M1  => "M1",
            Timeframe::M5  => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1  => "H1",
            Timeframe::H4  => "H4",
            Timeframe::D1  => "D1",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "M1"  => Ok(Timeframe::M1),
            "M5"  => Ok(Timeframe::M5),
            "M15" => Ok(Timeframe::M15),
            "M30" => Ok(Timeframe::M30),
            "H1"  => Ok(Timeframe::H1),
            "H4"  => Ok(Timeframe::H4),
            "D1"  => Ok(Timeframe::D1),
            other => Err(format!("Unknown timeframe '{other}'. Use M1, M5, M15, M30, H1, H4 or D1")),
        }
    }
}
