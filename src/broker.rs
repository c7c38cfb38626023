//! # broker
//!
//! Explicit broker snapshot — บัญชี, Position ที่เปิดอยู่ และสเปกของแต่ละ Symbol
//! ถ่ายไว้ ณ เวลาเดียวกัน แล้วส่งเข้า Survival Risk Engine ตรงๆ
//!
//! There is no ambient connection handle: a [`BrokerSnapshot`] is built with
//! [`BrokerSnapshot::capture`] from any [`BrokerSource`] and replaced wholesale
//! with [`BrokerSnapshot::refresh`]. Callers that already hold the data (e.g. a
//! request body) use [`BrokerSnapshot::new`].

use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::{
    check_trade_feasibility, phantom_equity_report, PhantomEquity, RiskError, SpecsLookup,
    TradeFeasibility,
};
use crate::models::{AccountSnapshot, AssetSpecs, Candle, Direction, Position, Timeframe};

// ─── Collaborator Contracts ───────────────────────────────────────────────────

/// Supplies account state, open positions and per-symbol specs.
pub trait BrokerSource {
    fn fetch_account(&self) -> impl Future<Output = anyhow::Result<AccountSnapshot>> + Send;
    fn fetch_positions(&self) -> impl Future<Output = anyhow::Result<Vec<Position>>> + Send;
    fn fetch_specs(&self, symbol: &str) -> impl Future<Output = anyhow::Result<AssetSpecs>> + Send;
}

/// Supplies an ordered, de-duplicated candle series.
pub trait CandleSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<Candle>>> + Send;
}

// ─── BrokerSnapshot ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BrokerSnapshot {
    pub account: AccountSnapshot,
    pub positions: Vec<Position>,
    /// Keyed by symbol; leverage already capped by the account leverage.
    pub specs: HashMap<String, AssetSpecs>,
    pub captured_at: DateTime<Utc>,
}

impl BrokerSnapshot {
    pub fn new(
        account: AccountSnapshot,
        positions: Vec<Position>,
        specs: HashMap<String, AssetSpecs>,
    ) -> Self {
        let leverage_account = account.leverage_account;
        let specs = specs
            .into_iter()
            .map(|(symbol, s)| (symbol, s.capped_by(leverage_account)))
            .collect();

        Self {
            account,
            positions,
            specs,
            captured_at: Utc::now(),
        }
    }

    /// Pull a fresh snapshot, including specs for every held symbol plus
    /// `extra_symbols` (typically the ticker about to be sized).
    pub async fn capture<S: BrokerSource>(source: &S, extra_symbols: &[&str]) -> anyhow::Result<Self> {
        let mut account = source.fetch_account().await.context("Failed to fetch account")?;
        let positions = source.fetch_positions().await.context("Failed to fetch positions")?;
        account.positions_count = positions.len() as u32;

        let symbols: BTreeSet<&str> = positions
            .iter()
            .map(|p| p.symbol.as_str())
            .chain(extra_symbols.iter().copied())
            .collect();

        let mut specs = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let s = source
                .fetch_specs(symbol)
                .await
                .with_context(|| format!("Failed to fetch specs for {symbol}"))?;
            specs.insert(symbol.to_string(), s);
        }

        info!(
            equity    = account.equity,
            margin    = account.used_margin,
            positions = positions.len(),
            symbols   = specs.len(),
            "📸 Broker snapshot captured"
        );

        Ok(Self::new(account, positions, specs))
    }

    /// Replace this snapshot with a newly captured one. On error the old
    /// snapshot is left untouched.
    pub async fn refresh<S: BrokerSource>(&mut self, source: &S, extra_symbols: &[&str]) -> anyhow::Result<()> {
        let fresh = Self::capture(source, extra_symbols).await?;
        debug!(
            previous = %self.captured_at,
            current  = %fresh.captured_at,
            "Broker snapshot refreshed"
        );
        *self = fresh;
        Ok(())
    }

    pub fn phantom_equity(&self) -> Result<PhantomEquity, RiskError> {
        phantom_equity_report(&self.account, &self.positions, self)
    }

    pub fn feasibility(
        &self,
        ticker: &str,
        direction: Direction,
        entry_price: f64,
        stop_loss_price: f64,
    ) -> TradeFeasibility {
        check_trade_feasibility(
            ticker,
            direction,
            entry_price,
            stop_loss_price,
            &self.account,
            &self.positions,
            self,
        )
    }
}

impl SpecsLookup for BrokerSnapshot {
    fn specs_for(&self, symbol: &str) -> Option<&AssetSpecs> {
        self.specs.get(symbol)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
