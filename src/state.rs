//! # state
//!
//! Shared state injected into every Axum handler. Nothing here is mutable:
//! each request captures its own snapshot and runs the pure engines on it.

use std::sync::Arc;

use crate::bridge::Mt5Bridge;
use crate::config::Config;

// ─── AppState ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// None = ไม่ได้ตั้ง `MT5_BRIDGE_URL`
    /// ใช้ reqwest Client ตัวเดียวทั้งระบบ (connection pooling)
    pub bridge: Option<Mt5Bridge>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let bridge = config.bridge_url.as_ref().map(|url| {
            Mt5Bridge::new(reqwest::Client::new(), url.clone(), config.bridge_timeout)
        });

        Self {
            config: Arc::new(config),
            bridge,
        }
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(config: Config) -> SharedState {
    Arc::new(AppState::new(config))
}
