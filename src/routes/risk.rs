//! # routes::risk
//!
//! Survival Risk Engine endpoints
//!
//! | Method | Path                      | Description                                   |
//! |--------|---------------------------|-----------------------------------------------|
//! | POST   | `/api/risk/phantom`       | Phantom Equity จาก snapshot ใน body            |
//! | GET    | `/api/risk/phantom`       | Phantom Equity จาก MT5 Bridge                  |
//! | POST   | `/api/risk/feasibility`   | ขนาด Lot สูงสุดจาก snapshot ใน body             |
//! | GET    | `/api/risk/feasibility`   | ขนาด Lot สูงสุดจาก MT5 Bridge                   |
//!
//! An infeasible trade is a normal `200` response with `allowed: false`.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    broker::BrokerSnapshot,
    error::AppError,
    models::{AccountSnapshot, AssetSpecs, Direction, Position},
    state::SharedState,
};

// ─── Request Bodies ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SnapshotBody {
    pub account:   AccountSnapshot,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub specs:     HashMap<String, AssetSpecs>,
}

impl SnapshotBody {
    fn into_snapshot(self) -> BrokerSnapshot {
        BrokerSnapshot::new(self.account, self.positions, self.specs)
    }
}

#[derive(Deserialize)]
pub struct TradeIdea {
    pub ticker:          String,
    pub direction:       Direction,
    pub entry_price:     f64,
    pub stop_loss_price: f64,
}

impl TradeIdea {
    fn validate(&self) -> Result<(), AppError> {
        if self.ticker.trim().is_empty() {
            return Err(AppError::BadRequest("ticker must not be empty".into()));
        }
        if !self.entry_price.is_finite() || self.entry_price <= 0.0 {
            return Err(AppError::BadRequest(format!(
                "entry_price must be positive, got {}", self.entry_price
            )));
        }
        if !self.stop_loss_price.is_finite() || self.stop_loss_price <= 0.0 {
            return Err(AppError::BadRequest(format!(
                "stop_loss_price must be positive, got {}", self.stop_loss_price
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct FeasibilityBody {
    #[serde(flatten)]
    pub trade:    TradeIdea,
    #[serde(flatten)]
    pub snapshot: SnapshotBody,
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/risk/phantom
pub async fn phantom_from_body(
    Json(body): Json<SnapshotBody>,
) -> Result<impl IntoResponse, AppError> {
    let report = body.into_snapshot().phantom_equity()?;
    Ok(Json(json!({ "ok": true, "phantom": report })))
}

/// GET /api/risk/phantom
pub async fn phantom_live(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let bridge = state.bridge.as_ref().ok_or(AppError::BridgeUnavailable)?;
    let snapshot = BrokerSnapshot::capture(bridge, &[])
        .await
        .map_err(AppError::Upstream)?;

    let report = snapshot.phantom_equity()?;
    Ok(Json(json!({
        "ok":          true,
        "captured_at": snapshot.captured_at,
        "phantom":     report,
    })))
}

/// POST /api/risk/feasibility
pub async fn feasibility_from_body(
    Json(body): Json<FeasibilityBody>,
) -> Result<impl IntoResponse, AppError> {
    body.trade.validate()?;
    let trade = body.trade;
    let result = body.snapshot.into_snapshot().feasibility(
        &trade.ticker,
        trade.direction,
        trade.entry_price,
        trade.stop_loss_price,
    );
    Ok(Json(json!({ "ok": true, "result": result })))
}

/// GET /api/risk/feasibility?ticker=XAUUSD&direction=BUY&entry_price=..&stop_loss_price=..
pub async fn feasibility_live(
    State(state): State<SharedState>,
    Query(trade): Query<TradeIdea>,
) -> Result<impl IntoResponse, AppError> {
    trade.validate()?;
    let bridge = state.bridge.as_ref().ok_or(AppError::BridgeUnavailable)?;
    let snapshot = BrokerSnapshot::capture(bridge, &[trade.ticker.as_str()])
        .await
        .map_err(AppError::Upstream)?;

    let result = snapshot.feasibility(
        &trade.ticker,
        trade.direction,
        trade.entry_price,
        trade.stop_loss_price,
    );
    Ok(Json(json!({
        "ok":          true,
        "captured_at": snapshot.captured_at,
        "result":      result,
    })))
}
