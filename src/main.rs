mod api;
mod bootstrap;
mod config;
mod error;
mod escrow;
mod pledges;
mod receipts;
mod server;
mod settlement;
mod units;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settlement::SettlementScheduler;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,leafscan_backend=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("🚀 Starting Leafscan Donation Settlement Backend");

    dotenv::dotenv().ok();
    let settings = config::Settings::from_env();
    let bind_address = settings.bind_address.clone();

    let state = bootstrap::initialize_app_state(settings.clone()).await?;

    // Weekly settlement trigger runs for the life of the process.
    let scheduler = SettlementScheduler::new(
        settings.settlement_weekday,
        settings.settlement_hour,
        Arc::clone(&state.orchestrator),
    );
    let _scheduler_handle = scheduler.start();
    info!(
        weekday = settings.settlement_weekday,
        hour = settings.settlement_hour,
        "✅ Weekly settlement scheduler started"
    );

    let app = server::create_app(state);
    server::run_server(app, &bind_address).await?;

    Ok(())
}
