use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::api::models::{
    CreatePledgeRequest, HealthResponse, ReceiptListQuery, ReceiptResponse, RunSettlementRequest,
};
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::escrow::EscrowStatus;
use crate::pledges::{Ngo, NgoStore, Pledge, PledgeStore};
use crate::receipts::{Receipt, ReceiptStore};
use crate::settlement::{SettlementBackend, SettlementOrchestrator, SettlementOutcome};
use crate::units;

const DEFAULT_RECEIPT_LIMIT: i64 = 20;
const MAX_RECEIPT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub pledges: Arc<dyn PledgeStore>,
    pub ngos: Arc<dyn NgoStore>,
    pub receipts: Arc<dyn ReceiptStore>,
    pub backend: Arc<dyn SettlementBackend>,
    pub orchestrator: Arc<SettlementOrchestrator>,
}

impl AppState {
    fn receipt_response(&self, receipt: Receipt) -> ReceiptResponse {
        // In-process ledger signatures have no explorer page.
        let explorer_url = (receipt.cluster != "ledger").then(|| {
            units::explorer_url(
                &self.settings.explorer_base_url,
                &receipt.tx_signature,
                &receipt.cluster,
            )
        });
        ReceiptResponse {
            receipt,
            explorer_url,
        }
    }
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/v1/pledges
pub async fn create_pledge(
    State(state): State<AppState>,
    Json(request): Json<CreatePledgeRequest>,
) -> AppResult<Json<Pledge>> {
    if request.points < units::MIN_PLEDGE_POINTS {
        return Err(AppError::InvalidInput(format!(
            "pledge must be at least {} points",
            units::MIN_PLEDGE_POINTS
        )));
    }

    let ngo = state
        .ngos
        .find(request.ngo_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("ngo {}", request.ngo_id)))?;
    if !ngo.is_active {
        return Err(AppError::InvalidInput(format!(
            "ngo {} is not accepting pledges",
            ngo.id
        )));
    }

    let week_number = request
        .week_number
        .unwrap_or_else(units::current_week_number);
    let pledge = state
        .pledges
        .create(Pledge::new(
            request.user_id,
            request.ngo_id,
            request.points,
            week_number,
        ))
        .await?;

    info!(
        pledge_id = %pledge.id,
        ngo = %ngo.name,
        points = pledge.points,
        week_number,
        "pledge created"
    );
    Ok(Json(pledge))
}

/// GET /api/v1/pledges/:id
pub async fn get_pledge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Pledge>> {
    let pledge = state
        .pledges
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pledge {}", id)))?;
    Ok(Json(pledge))
}

/// GET /api/v1/ngos
pub async fn list_ngos(State(state): State<AppState>) -> AppResult<Json<Vec<Ngo>>> {
    Ok(Json(state.ngos.list_active().await?))
}

/// GET /api/v1/receipts?limit=N
pub async fn list_receipts(
    State(state): State<AppState>,
    Query(query): Query<ReceiptListQuery>,
) -> AppResult<Json<Vec<ReceiptResponse>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECEIPT_LIMIT)
        .clamp(1, MAX_RECEIPT_LIMIT);
    let receipts = state.receipts.list(limit).await?;
    Ok(Json(
        receipts
            .into_iter()
            .map(|r| state.receipt_response(r))
            .collect(),
    ))
}

/// GET /api/v1/receipts/:period
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(period): Path<i64>,
) -> AppResult<Json<ReceiptResponse>> {
    let receipt = state
        .receipts
        .find_by_week(period)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("receipt for period {}", period)))?;
    Ok(Json(state.receipt_response(receipt)))
}

/// POST /api/v1/admin/settlement/run
pub async fn run_settlement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RunSettlementRequest>,
) -> AppResult<Json<SettlementOutcome>> {
    require_admin(&state, &headers)?;
    info!(period = ?request.period, dry_run = request.dry_run, "manual settlement triggered");
    let outcome = state
        .orchestrator
        .run_cycle(request.period, request.dry_run)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/admin/escrow/status
pub async fn escrow_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<EscrowStatus>> {
    require_admin(&state, &headers)?;
    let status = state.backend.status().await.map_err(AppError::Settlement)?;
    Ok(Json(status))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let token = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    if token != state.settings.admin_api_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
