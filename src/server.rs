use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handlers::{
    create_pledge, escrow_status, get_pledge, get_receipt, health_check, list_ngos, list_receipts,
    run_settlement, AppState,
};

pub fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Pledge endpoints
                .route("/pledges", post(create_pledge))
                .route("/pledges/:id", get(get_pledge))
                // NGO directory
                .route("/ngos", get(list_ngos))
                // Settlement receipts
                .route("/receipts", get(list_receipts))
                .route("/receipts/:period", get(get_receipt))
                // Admin endpoints (x-admin-token)
                .route("/admin/settlement/run", post(run_settlement))
                .route("/admin/escrow/status", get(escrow_status)),
        )
        // Allow all origins in dev, restrict in prod
        .layer(CorsLayer::very_permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        // Add request tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(
    app: Router,
    bind_address: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
