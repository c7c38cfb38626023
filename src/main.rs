//! # Gapsentry — FVG & Survival Risk Analytics
//!
//! ```text
//!  ┌─────────────┐  POST /api/fvg/detect        ┌──────────────────────────┐
//!  │  Dashboard  │ ───────────────────────────▶ │ engine::fvg              │
//!  │  (charts /  │  POST /api/risk/feasibility  │ engine::survival         │
//!  │   sizing)   │ ───────────────────────────▶ │   (pure, no state)       │
//!  └─────────────┘                              └────────────▲─────────────┘
//!                   GET /api/fvg/:symbol                     │ BrokerSnapshot
//!                   GET /api/risk/*                          │ Vec<Candle>
//!                                               ┌────────────┴─────────────┐
//!                                               │ bridge::Mt5Bridge        │──▶ mt5-bridge
//!                                               └──────────────────────────┘
//! ```
//!
//! The service only *advises*; it never places orders.

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gapsentry::{config::Config, routes, state::build_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("gapsentry=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║           GAPSENTRY — Gap & Survival Analytics        ║
  ║      Fair Value Gaps · Phantom Equity · Sizing        ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Config & shared state ──────────────────────────────────────────────
    let config = Config::from_env()?;
    let addr = config.bind_addr;
    match &config.bridge_url {
        Some(url) => info!(bridge = %url, "🔌 MT5 bridge configured"),
        None => warn!("MT5_BRIDGE_URL not set — live routes will return 503"),
    }
    let state = build_state(config);

    // ── 4. Router ─────────────────────────────────────────────────────────────
    let app = routes::router(state);

    // ── 5. Bind & Serve ───────────────────────────────────────────────────────
    info!(?addr, "🚀 Gapsentry server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
