//! # config — อ่าน Config จาก Environment Variables
//!
//! | Variable                | Default        | Description                          |
//! |-------------------------|----------------|--------------------------------------|
//! | `BIND_ADDR`             | `0.0.0.0:3000` | Address Axum listens on              |
//! | `MT5_BRIDGE_URL`        | *(unset)*      | mt5-bridge base URL; unset disables the bridge-backed routes |
//! | `BRIDGE_TIMEOUT_SECS`   | `5`            | Per-request timeout to the bridge    |
//! | `FVG_DEFAULT_CANDLES`   | `200`          | Candles fetched when `count` omitted |
//! | `FVG_DEFAULT_TIMEFRAME` | `H4`           | Timeframe used when omitted          |
//! | `RUST_LOG`              | `gapsentry=debug` | Tracing filter                    |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use crate::models::Timeframe;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr:             SocketAddr,
    /// None = ไม่มี MT5 Bridge → route ที่ต้องดึงข้อมูลสดจะตอบ 503
    pub bridge_url:            Option<String>,
    pub bridge_timeout:        Duration,
    pub default_candle_count:  usize,
    pub default_timeframe:     Timeframe,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address, e.g. 0.0.0.0:3000")?;

        let timeout_secs: u64 = std::env::var("BRIDGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("BRIDGE_TIMEOUT_SECS must be a number")?;

        let default_candle_count: usize = std::env::var("FVG_DEFAULT_CANDLES")
            .unwrap_or_else(|_| "200".to_string())
            .parse()
            .context("FVG_DEFAULT_CANDLES must be a number")?;

        let default_timeframe: Timeframe = std::env::var("FVG_DEFAULT_TIMEFRAME")
            .unwrap_or_else(|_| "H4".to_string())
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Invalid FVG_DEFAULT_TIMEFRAME")?;

        Ok(Self {
            bind_addr,
            bridge_url:           std::env::var("MT5_BRIDGE_URL").ok().filter(|u| !u.trim().is_empty()),
            bridge_timeout:       Duration::from_secs(timeout_secs),
            default_candle_count,
            default_timeframe,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr:            SocketAddr::from(([0, 0, 0, 0], 3000)),
            bridge_url:           None,
            bridge_timeout:       Duration::from_secs(5),
            default_candle_count: 200,
            default_timeframe:    Timeframe::H4,
        }
    }
}
