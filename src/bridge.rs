//! # bridge — MT5 Bridge HTTP adapter
//!
//! ดึงข้อมูลจาก mt5-bridge (Python service ที่คุย MetaTrader 5 terminal)
//! แล้วแปลงเป็น model ของเรา
//!
//! ## Bridge API Contract
//!
//! | Method | Path                                             | MT5 call          |
//! |--------|--------------------------------------------------|-------------------|
//! | GET    | `/api/market/candles?symbol=&timeframe=&count=`  | `copy_rates_from_pos` |
//! | GET    | `/api/account`                                   | `account_info`    |
//! | GET    | `/api/positions`                                 | `positions_get`   |
//! | GET    | `/api/symbol?symbol=`                            | `symbol_info`     |
//!
//! Field names below follow MT5's own naming so the bridge can forward the
//! terminal's structs unchanged.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::broker::{BrokerSource, CandleSource};
use crate::models::{AccountSnapshot, AssetSpecs, Candle, Direction, Position, Timeframe};

/// MT5 `POSITION_TYPE_BUY`
const POSITION_TYPE_BUY: i32 = 0;
/// MT5 `POSITION_TYPE_SELL`
const POSITION_TYPE_SELL: i32 = 1;

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BridgeCandle {
    /// Unix seconds
    time:  i64,
    open:  f64,
    high:  f64,
    low:   f64,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct BridgeAccount {
    balance:     f64,
    equity:      f64,
    profit:      f64,
    margin:      f64,
    margin_free: f64,
    leverage:    f64,
}

#[derive(Debug, Deserialize)]
struct BridgePosition {
    ticket:        u64,
    symbol:        String,
    #[serde(rename = "type")]
    kind:          i32,
    volume:        f64,
    price_open:    f64,
    price_current: f64,
    /// 0.0 = no stop loss
    sl:            f64,
    profit:        f64,
}

#[derive(Debug, Deserialize)]
struct BridgeSymbol {
    trade_contract_size: f64,
    #[serde(default)]
    trade_tick_value:    f64,
    volume_min:          f64,
    volume_max:          f64,
    volume_step:         f64,
    #[serde(default)]
    margin_initial:      f64,
    digits:              u32,
    /// Per-symbol leverage if the broker exposes one. Falls back to the
    /// account leverage when absent.
    #[serde(default)]
    leverage:            Option<f64>,
}

// ─── Conversions ──────────────────────────────────────────────────────────────

impl BridgeCandle {
    fn into_candle(self) -> Option<Candle> {
        let time = DateTime::<Utc>::from_timestamp(self.time, 0)?;
        Some(Candle::new(time, self.open, self.high, self.low, self.close))
    }
}

impl From<BridgeAccount> for AccountSnapshot {
    fn from(a: BridgeAccount) -> Self {
        Self {
            balance:          a.balance,
            equity:           a.equity,
            floating_pl:      a.profit,
            used_margin:      a.margin,
            free_margin:      a.margin_free,
            positions_count:  0,
            leverage_account: a.leverage,
        }
    }
}

impl TryFrom<BridgePosition> for Position {
    type Error = anyhow::Error;

    fn try_from(p: BridgePosition) -> anyhow::Result<Self> {
        let direction = match p.kind {
            POSITION_TYPE_BUY  => Direction::Long,
            POSITION_TYPE_SELL => Direction::Short,
            other => anyhow::bail!("Position {} has unknown type {other}", p.ticket),
        };

        Ok(Self {
            ticket:        p.ticket,
            symbol:        p.symbol,
            direction,
            lots:          p.volume,
            entry_price:   p.price_open,
            current_price: p.price_current,
            stop_loss:     (p.sl != 0.0).then_some(p.sl),
            profit:        p.profit,
        })
    }
}

impl From<BridgeSymbol> for AssetSpecs {
    fn from(s: BridgeSymbol) -> Self {
        Self {
            // 0.0 → capped_by() จะแทนด้วย Leverage ของบัญชี
            leverage:      s.leverage.unwrap_or(0.0),
            contract_size: s.trade_contract_size,
            tick_value:    s.trade_tick_value,
            min_lot:       s.volume_min,
            max_lot:       s.volume_max,
            step_lot:      s.volume_step,
            margin_min:    s.margin_initial,
            digits:        s.digits,
        }
    }
}

/// Sort ascending by time and keep the last bar for any repeated timestamp.
pub fn normalize_candles(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.time);
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => out.push(candle),
        }
    }
    out
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// HTTP client for the MT5 bridge. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Mt5Bridge {
    client:   reqwest::Client,
    base_url: String,
    timeout:  Duration,
}

impl Mt5Bridge {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, ?query, "→ MT5 bridge");

        self.client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("MT5 bridge unreachable at {url}"))?
            .error_for_status()
            .with_context(|| format!("MT5 bridge returned an error for {path}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse MT5 bridge response from {path}"))
    }
}

impl CandleSource for Mt5Bridge {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> anyhow::Result<Vec<Candle>> {
        let raw: Vec<BridgeCandle> = self
            .get_json(
                "/api/market/candles",
                &[
                    ("symbol", symbol.to_string()),
                    ("timeframe", timeframe.to_string()),
                    ("count", count.to_string()),
                ],
            )
            .await?;

        let received = raw.len();
        let candles: Vec<Candle> = raw.into_iter().filter_map(BridgeCandle::into_candle).collect();
        if candles.len() < received {
            warn!(
                symbol,
                dropped = received - candles.len(),
                "Candles with out-of-range timestamps dropped"
            );
        }
        Ok(normalize_candles(candles))
    }
}

impl BrokerSource for Mt5Bridge {
    async fn fetch_account(&self) -> anyhow::Result<AccountSnapshot> {
        let raw: BridgeAccount = self.get_json("/api/account", &[]).await?;
        Ok(raw.into())
    }

    async fn fetch_positions(&self) -> anyhow::Result<Vec<Position>> {
        let raw: Vec<BridgePosition> = self.get_json("/api/positions", &[]).await?;
        raw.into_iter().map(Position::try_from).collect()
    }

    async fn fetch_specs(&self, symbol: &str) -> anyhow::Result<AssetSpecs> {
        let raw: BridgeSymbol = self
            .get_json("/api/symbol", &[("symbol", symbol.to_string())])
            .await?;
        Ok(raw.into())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_without_sl_maps_to_none() {
        let raw: BridgePosition = serde_json::from_str(
            r#"{"ticket":5,"symbol":"XAUUSD","type":1,"volume":0.2,
                "price_open":2000.0,"price_current":1995.0,"sl":0.0,"profit":100.0}"#,
        )
        .unwrap();
        let position = Position::try_from(raw).unwrap();

        assert_eq!(position.direction, Direction::Short);
        assert_eq!(position.stop_loss, None);
        assert_eq!(position.lots, 0.2);
    }

    #[test]
    fn test_unknown_position_type_rejected() {
        let raw: BridgePosition = serde_json::from_str(
            r#"{"ticket":5,"symbol":"XAUUSD","type":4,"volume":0.2,
                "price_open":2000.0,"price_current":1995.0,"sl":1990.0,"profit":0.0}"#,
        )
        .unwrap();
        assert!(Position::try_from(raw).is_err());
    }

    #[test]
    fn test_account_field_mapping() {
        let raw: BridgeAccount = serde_json::from_str(
            r#"{"balance":1000.0,"equity":1050.0,"profit":50.0,"margin":120.0,
                "margin_free":930.0,"leverage":200}"#,
        )
        .unwrap();
        let account = AccountSnapshot::from(raw);

        assert_eq!(account.floating_pl, 50.0);
        assert_eq!(account.used_margin, 120.0);
        assert_eq!(account.leverage_account, 200.0);
    }

    #[test]
    fn test_symbol_without_leverage_takes_account_leverage() {
        let raw: BridgeSymbol = serde_json::from_str(
            r#"{"trade_contract_size":100.0,"volume_min":0.01,"volume_max":50.0,
                "volume_step":0.01,"digits":2}"#,
        )
        .unwrap();
        let specs = AssetSpecs::from(raw).capped_by(100.0);
        assert_eq!(specs.leverage, 100.0);
        assert_eq!(specs.contract_size, 100.0);
    }

    #[test]
    fn test_normalize_sorts_and_dedupes() {
        let at = |s: i64| DateTime::<Utc>::from_timestamp(s, 0).unwrap();
        let candles = vec![
            Candle::new(at(120), 3.0, 3.0, 3.0, 3.0),
            Candle::new(at(60), 1.0, 1.0, 1.0, 1.0),
            Candle::new(at(60), 2.0, 2.0, 2.0, 2.0),
        ];
        let out = normalize_candles(candles);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].close, 2.0);
        assert_eq!(out[1].time, at(120));
    }
}
