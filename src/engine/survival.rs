//! # engine::survival
//!
//! **Survival Risk Engine** — คำนวณ "Phantom Equity" (Equity ถ้าทุก Position
//! โดน SL พร้อมกัน) แล้วหาขนาด Lot สูงสุดที่เปิดเพิ่มได้โดยไม่เสี่ยง Margin Call
//!
//! ## ลำดับการคำนวณ
//!
//! ```text
//! equity ── Σ loss-to-stop (เฉพาะ Position ที่มี SL) ──▶ phantom equity
//!                                                          │
//!                                         − used margin    ▼
//!                                                    survival space
//!                                                          │
//!            ÷ (margin + risk ต่อ 0.01 lot) ──▶ floor ──▶ max lots
//! ```
//!
//! The new trade's margin *and* its worst-case loss are both charged against
//! the same buffer that already reflects the worst case of existing trades.
//!
//! Positions without a stop loss contribute nothing to the worst case. That
//! understates real exposure, so their tickets are reported back in
//! `unprotected_tickets` on every result and logged at `warn`.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::round_to;
use crate::models::{AccountSnapshot, AssetSpecs, Direction, Position};

/// Smallest tradable increment and the unit every size is counted in.
pub const MICROLOT: f64 = 0.01;

// ─── Specs Lookup ─────────────────────────────────────────────────────────────

/// Anything that can answer "what are the economics of this symbol?".
pub trait SpecsLookup {
    fn specs_for(&self, symbol: &str) -> Option<&AssetSpecs>;
}

impl SpecsLookup for HashMap<String, AssetSpecs> {
    fn specs_for(&self, symbol: &str) -> Option<&AssetSpecs> {
        self.get(symbol)
    }
}

// ─── Errors / Rejections ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// An open position references a symbol with no known contract specs.
    #[error("No asset specs for symbol '{0}'")]
    MissingSpecs(String),
}

/// Why a trade was judged infeasible. Each variant carries the numbers that
/// led to the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    #[error(
        "No remaining survival buffer: phantom equity {phantom_equity:.2} minus used margin \
         {used_margin:.2} leaves {survival_space:.2}"
    )]
    NoSurvivalBuffer {
        phantom_equity: f64,
        used_margin: f64,
        survival_space: f64,
    },

    #[error("Invalid asset specs for {symbol}: {detail}")]
    InvalidSpecs { symbol: String, detail: String },

    #[error(
        "Insufficient survival space for 0.01 lots: need {required_per_microlot:.2}, \
         have {survival_space:.2} (short by {shortfall:.2})"
    )]
    InsufficientSurvivalSpace {
        survival_space: f64,
        required_per_microlot: f64,
        shortfall: f64,
    },
}

// ─── Phantom Equity ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhantomEquity {
    pub equity: f64,
    /// Sum of loss-to-stop across positions that have a stop. Negative when
    /// the stops lock in net profit.
    pub potential_future_loss: f64,
    pub phantom_equity: f64,
    /// Positions left out of the worst case because they have no stop loss.
    pub unprotected_tickets: Vec<u64>,
}

/// Worst-case equity with its breakdown.
pub fn phantom_equity_report(
    account: &AccountSnapshot,
    positions: &[Position],
    specs: &impl SpecsLookup,
) -> Result<PhantomEquity, RiskError> {
    let mut potential_future_loss = 0.0;
    let unprotected_tickets = unprotected_tickets(positions);

    for position in positions {
        let Some(loss_distance) = position.loss_distance() else {
            continue;
        };

        let contract_size = specs
            .specs_for(&position.symbol)
            .ok_or_else(|| RiskError::MissingSpecs(position.symbol.clone()))?
            .contract_size;

        let money_at_risk = loss_distance * contract_size * position.lots;
        debug!(
            ticket = position.ticket,
            symbol = %position.symbol,
            loss_distance,
            money_at_risk,
            "Position worst case"
        );
        potential_future_loss += money_at_risk;
    }

    if !unprotected_tickets.is_empty() {
        warn!(
            tickets = ?unprotected_tickets,
            "⚠️ Positions without stop loss excluded from worst-case equity"
        );
    }

    Ok(PhantomEquity {
        equity: account.equity,
        potential_future_loss,
        phantom_equity: account.equity - potential_future_loss,
        unprotected_tickets,
    })
}

/// Tickets of positions that have no stop loss, in input order.
fn unprotected_tickets(positions: &[Position]) -> Vec<u64> {
    positions
        .iter()
        .filter(|p| p.stop_loss.is_none())
        .map(|p| p.ticket)
        .collect()
}

/// Equity the account would show if every stop were hit right now.
pub fn calculate_phantom_equity(
    account: &AccountSnapshot,
    positions: &[Position],
    specs: &impl SpecsLookup,
) -> Result<f64, RiskError> {
    phantom_equity_report(account, positions, specs).map(|r| r.phantom_equity)
}

// ─── Trade Feasibility ────────────────────────────────────────────────────────

/// Advisory sizing result. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeFeasibility {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lots: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_required: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_monetary: Option<f64>,
    /// Phantom equity the sizing was based on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival_equity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival_space: Option<f64>,
    pub unprotected_tickets: Vec<u64>,
}

impl TradeFeasibility {
    fn rejected(rejection: Rejection, unprotected_tickets: Vec<u64>) -> Self {
        warn!(reason = %rejection, "❌ Trade not feasible");
        Self {
            allowed: false,
            reason: Some(rejection.to_string()),
            rejection: Some(rejection),
            max_lots: None,
            margin_required: None,
            risk_monetary: None,
            survival_equity: None,
            survival_space: None,
            unprotected_tickets,
        }
    }
}

/// Largest size (in 0.01 lot steps) that can be added to `ticker` without the
/// new trade's margin plus loss-to-stop exceeding the survival space.
pub fn check_trade_feasibility(
    ticker: &str,
    direction: Direction,
    entry_price: f64,
    stop_loss_price: f64,
    account: &AccountSnapshot,
    positions: &[Position],
    specs: &impl SpecsLookup,
) -> TradeFeasibility {
    // ── [1] Survival space ────────────────────────────────────────────────────
    let report = match phantom_equity_report(account, positions, specs) {
        Ok(report) => report,
        Err(RiskError::MissingSpecs(symbol)) => {
            return TradeFeasibility::rejected(
                Rejection::InvalidSpecs {
                    symbol,
                    detail: "open position has no asset specs".into(),
                },
                unprotected_tickets(positions),
            );
        }
    };
    let unprotected = report.unprotected_tickets;
    let survival_space = report.phantom_equity - account.used_margin;

    // ── [2] พอร์ตเดิมก็เสี่ยง Margin Call อยู่แล้ว ──────────────────────────────
    if survival_space <= 0.0 {
        return TradeFeasibility::rejected(
            Rejection::NoSurvivalBuffer {
                phantom_equity: report.phantom_equity,
                used_margin: account.used_margin,
                survival_space,
            },
            unprotected,
        );
    }

    let Some(asset) = specs.specs_for(ticker) else {
        return TradeFeasibility::rejected(
            Rejection::InvalidSpecs {
                symbol: ticker.to_string(),
                detail: "no asset specs for ticker".into(),
            },
            unprotected,
        );
    };

    let stop_distance = match direction {
        Direction::Long  => entry_price - stop_loss_price,
        Direction::Short => stop_loss_price - entry_price,
    };
    if stop_distance <= 0.0 {
        warn!(
            ticker,
            direction = ?direction,
            entry_price,
            stop_loss_price,
            "Stop loss is not on the losing side of the entry"
        );
    }

    // ── [3]-[6] Cost of one microlot ──────────────────────────────────────────
    let contract_value = asset.contract_size * MICROLOT;
    let required_margin = entry_price * contract_value / asset.leverage;
    let monetary_risk = (entry_price - stop_loss_price).abs() * contract_value;
    let total_impact_per_micro = required_margin + monetary_risk;

    // ── [7] Degenerate specs ──────────────────────────────────────────────────
    if !total_impact_per_micro.is_finite() || total_impact_per_micro <= 0.0 {
        return TradeFeasibility::rejected(
            Rejection::InvalidSpecs {
                symbol: ticker.to_string(),
                detail: format!(
                    "cost per {MICROLOT} lots is {total_impact_per_micro} \
                     (contract_size={}, leverage={})",
                    asset.contract_size, asset.leverage
                ),
            },
            unprotected,
        );
    }

    // ── [8]-[9] Max size ──────────────────────────────────────────────────────
    let max_microlots = (survival_space / total_impact_per_micro).floor();
    if max_microlots < 1.0 {
        return TradeFeasibility::rejected(
            Rejection::InsufficientSurvivalSpace {
                survival_space,
                required_per_microlot: total_impact_per_micro,
                shortfall: total_impact_per_micro - survival_space,
            },
            unprotected,
        );
    }
    let max_lots = round_to(max_microlots * MICROLOT, 2);

    // ── [10] Approved ─────────────────────────────────────────────────────────
    let margin_required = round_to(required_margin * max_microlots, 2);
    let risk_monetary = round_to(monetary_risk * max_microlots, 2);

    info!(
        ticker,
        direction = ?direction,
        max_lots,
        margin_required,
        risk_monetary,
        survival_space,
        "✅ Trade feasible"
    );

    TradeFeasibility {
        allowed: true,
        reason: None,
        rejection: None,
        max_lots: Some(max_lots),
        margin_required: Some(margin_required),
        risk_monetary: Some(risk_monetary),
        survival_equity: Some(report.phantom_equity),
        survival_space: Some(survival_space),
        unprotected_tickets: unprotected,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
