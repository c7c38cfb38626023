//! # routes::fvg
//!
//! Fair Value Gap endpoints
//!
//! | Method | Path                 | Description                              |
//! |--------|----------------------|------------------------------------------|
//! | POST   | `/api/fvg/detect`    | หา FVG จากแท่งเทียนที่ส่งมาใน body         |
//! | GET    | `/api/fvg/:symbol`   | ดึงแท่งเทียนจาก MT5 Bridge แล้วหา FVG      |

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    broker::CandleSource,
    engine::detect_fvgs,
    error::AppError,
    models::{Candle, Timeframe},
    state::SharedState,
};

#[derive(Deserialize)]
pub struct DetectBody {
    pub candles: Vec<Candle>,
}

#[derive(Deserialize)]
pub struct LiveQuery {
    pub timeframe: Option<String>,
    pub count:     Option<usize>,
}

/// POST /api/fvg/detect
pub async fn detect(Json(body): Json<DetectBody>) -> impl IntoResponse {
    let fvgs = detect_fvgs(&body.candles);
    Json(json!({
        "ok":      true,
        "candles": body.candles.len(),
        "count":   fvgs.len(),
        "fvgs":    fvgs,
    }))
}

/// GET /api/fvg/:symbol?timeframe=H4&count=200
pub async fn detect_live(
    State(state): State<SharedState>,
    Path(symbol): Path<String>,
    Query(query): Query<LiveQuery>,
) -> Result<impl IntoResponse, AppError> {
    let bridge = state.bridge.as_ref().ok_or(AppError::BridgeUnavailable)?;

    let timeframe: Timeframe = match query.timeframe {
        Some(tf) => tf.parse().map_err(AppError::BadRequest)?,
        None     => state.config.default_timeframe,
    };
    let count = query.count.unwrap_or(state.config.default_candle_count);

    let candles = bridge
        .fetch_candles(&symbol, timeframe, count)
        .await
        .map_err(AppError::Upstream)?;
    let fvgs = detect_fvgs(&candles);

    info!(
        symbol   = %symbol,
        %timeframe,
        candles  = candles.len(),
        gaps     = fvgs.len(),
        "📐 FVG scan served"
    );

    Ok(Json(json!({
        "ok":        true,
        "symbol":    symbol,
        "timeframe": timeframe,
        "candles":   candles.len(),
        "count":     fvgs.len(),
        "fvgs":      fvgs,
    })))
}
