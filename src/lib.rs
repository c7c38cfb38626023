//! # Gapsentry
//!
//! Two pure analytics engines plus the thin plumbing that feeds them:
//!
//! * [`engine::fvg`] — Fair Value Gap detection and mitigation tracking
//! * [`engine::survival`] — phantom equity and survival-based position sizing
//! * [`broker`] / [`bridge`] — explicit broker snapshots, MT5 bridge adapter
//! * [`routes`] — axum JSON API for the dashboard

pub mod bridge;
pub mod broker;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
