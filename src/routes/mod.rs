//! HTTP surface. Handlers stay thin: parse, capture a snapshot if needed,
//! call the pure engines, wrap the result in `{ "ok": true, ... }`.

pub mod fvg;
pub mod risk;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::SharedState;

/// GET /api/health
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "ok":                true,
        "service":           "gapsentry",
        "version":           env!("CARGO_PKG_VERSION"),
        "bridge_configured": state.bridge.is_some(),
    }))
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health",           get(health_check))
        // ── Fair Value Gaps ───────────────────────────────────────────────────
        .route("/api/fvg/detect",       post(fvg::detect))
        .route("/api/fvg/:symbol",      get(fvg::detect_live))
        // ── Survival Risk ─────────────────────────────────────────────────────
        .route("/api/risk/phantom",     get(risk::phantom_live).post(risk::phantom_from_body))
        .route("/api/risk/feasibility", get(risk::feasibility_live).post(risk::feasibility_from_body))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{config::Config, state::build_state};

    fn app() -> Router {
        router(build_state(Config::default()))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn snapshot_json(equity: f64, used_margin: f64) -> Value {
        json!({
            "account": {
                "balance": equity, "equity": equity, "used_margin": used_margin,
                "leverage_account": 100.0
            },
            "positions": [{
                "ticket": 9, "symbol": "XAUUSD", "type": "BUY", "lots": 0.1,
                "entry_price": 2000.0, "current_price": 2010.0, "stop_loss": 1990.0
            }],
            "specs": { "XAUUSD": { "leverage": 500.0, "contract_size": 100.0 } }
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bridge_configured"], false);
    }

    #[tokio::test]
    async fn test_detect_from_body() {
        let body = json!({ "candles": [
            { "time": "2024-03-01T00:00:00Z", "open": 9.5,  "high": 10.0, "low": 9.0,  "close": 9.8 },
            { "time": "2024-03-01T04:00:00Z", "open": 9.8,  "high": 13.0, "low": 9.5,  "close": 12.8 },
            { "time": "2024-03-01T08:00:00Z", "open": 12.8, "high": 14.0, "low": 12.0, "close": 13.5 }
        ]});
        let (status, body) = send(post_json("/api/fvg/detect", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["fvgs"][0]["type"], "BULLISH");
        assert_eq!(body["fvgs"][0]["start_time"], 1_709_265_600_i64);
    }

    #[tokio::test]
    async fn test_phantom_from_body() {
        let (status, body) = send(post_json("/api/risk/phantom", snapshot_json(10_000.0, 0.0))).await;

        assert_eq!(status, StatusCode::OK);
        let phantom = body["phantom"]["phantom_equity"].as_f64().unwrap();
        assert!((phantom - 9_800.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_phantom_missing_specs_is_bad_request() {
        let mut snapshot = snapshot_json(10_000.0, 0.0);
        snapshot["specs"] = json!({});
        let (status, body) = send(post_json("/api/risk/phantom", snapshot)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_feasibility_from_body() {
        let mut req = snapshot_json(10_000.0, 200.0);
        req["ticker"] = json!("XAUUSD");
        req["direction"] = json!("LONG");
        req["entry_price"] = json!(2000.0);
        req["stop_loss_price"] = json!(1990.0);
        let (status, body) = send(post_json("/api/risk/feasibility", req)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["allowed"], true);
        // (9800 - 200) / (20 + 10) = 320 microlots
        assert_eq!(body["result"]["max_lots"].as_f64(), Some(3.2));
    }

    #[tokio::test]
    async fn test_feasibility_without_buffer_is_rejected_not_error() {
        let mut req = snapshot_json(10_000.0, 9_850.0);
        req["ticker"] = json!("XAUUSD");
        req["direction"] = json!("SELL");
        req["entry_price"] = json!(2000.0);
        req["stop_loss_price"] = json!(2010.0);
        let (status, body) = send(post_json("/api/risk/feasibility", req)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["allowed"], false);
        assert_eq!(body["result"]["rejection"]["code"], "NO_SURVIVAL_BUFFER");
    }

    #[tokio::test]
    async fn test_feasibility_rejects_non_positive_entry() {
        let mut req = snapshot_json(10_000.0, 0.0);
        req["ticker"] = json!("XAUUSD");
        req["direction"] = json!("LONG");
        req["entry_price"] = json!(0.0);
        req["stop_loss_price"] = json!(1990.0);
        let (status, _) = send(post_json("/api/risk/feasibility", req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_live_routes_need_bridge() {
        let (status, body) = send(Request::get("/api/fvg/XAUUSD").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ok"], false);

        let (status, _) = send(Request::get("/api/risk/phantom").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
