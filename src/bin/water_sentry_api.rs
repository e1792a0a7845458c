//! Water Sentry API Server
//!
//! REST API for water-quality readings: submit, classify, report
//!
//! Usage:
//!   cargo run --bin water_sentry_api
//!
//! Environment:
//!   PORT / WATER_PORT       - Server port (default: 8080)
//!   WATER_HOST              - Server host (default: 0.0.0.0)
//!   WATER_HISTORY_CAPACITY  - Readings kept in history (default: 100)
//!   WATER_SYNTHESIS         - heuristic | random (default: heuristic)
//!   WATER_SYNTHESIS_SEED    - Seed for random synthesis (default: 42)
//!   WATER_RATE_LIMIT        - Requests per minute per client (default: 120)
//!   MAIL_RELAY_URL          - HTTP mail relay; reports are logged when unset
//!   MAIL_RELAY_TOKEN        - Bearer token for the relay
//!   REPORT_FROM / REPORT_TO - Sender and default recipient
//!   WATER_TELEMETRY_DIR     - Telemetry export directory (default: ./telemetry)
//!   RUST_LOG                - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use water_sentry::api::{create_router, start_cleanup_task, AppState};
use water_sentry::{ServiceConfig, TelemetryCollector};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = ServiceConfig::from_env();

    let telemetry = Arc::new(TelemetryCollector::with_config(config.telemetry_dir.clone(), 1000));
    let telemetry_for_shutdown = telemetry.clone();

    let state = Arc::new(AppState::new(&config, telemetry)?);
    info!(
        "⚙️ Synthesis: {} | Mail transport: {} | History capacity: {}",
        state.synthesizer.strategy().name(),
        state.reporter.transport(),
        state.store.capacity()
    );

    let cleanup = start_cleanup_task(state.rate_limiter.clone());
    info!("🧹 Background cleanup task started");

    let app = create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;

    info!("🌊 Water Sentry API starting on http://{}", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /v1/submit          - Submit a reading (missing fields synthesized)");
    info!("  POST /v1/classify        - Stateless classification");
    info!("  POST /v1/classify/batch  - Batch classification (up to 100 readings)");
    info!("  GET  /v1/latest          - Latest reading (optional ?location=)");
    info!("  GET  /v1/history         - Recent readings (optional ?limit=)");
    info!("  POST /v1/report          - Email a report of the latest reading");
    info!("  GET  /v1/stats           - Service statistics");
    info!("  GET  /v1/health          - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    cleanup.abort();

    info!("🛑 Shutdown signal received, cleaning up...");
    info!("📊 Exporting final telemetry...");
    let stats = telemetry_for_shutdown.get_stats();
    info!("   {}", stats.summary());

    match telemetry_for_shutdown.export_stats_json() {
        Ok(path) => info!("   ✅ Stats exported to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to export stats: {}", e),
    }

    match telemetry_for_shutdown.export_stats_csv() {
        Ok(path) => info!("   ✅ Stats appended to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to append stats history: {}", e),
    }

    info!("👋 Water Sentry API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════╗
    ║                                                          ║
    ║              W A T E R   S E N T R Y                     ║
    ║                                                          ║
    ║          R I S K   A P I   v{:<8}                     ║
    ║     pH · TDS · Hardness · Nitrate classification         ║
    ║                                                          ║
    ╚══════════════════════════════════════════════════════════╝
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
