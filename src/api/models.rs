use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::receipts::Receipt;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreatePledgeRequest {
    pub user_id: Uuid,
    pub ngo_id: Uuid,
    pub points: i64,
    /// Defaults to the current ISO week.
    pub week_number: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptListQuery {
    pub limit: Option<i64>,
}

/// Receipt plus the explorer link, when the settlement landed on a real
/// cluster. In-process ledger signatures have nothing to link to.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    #[serde(flatten)]
    pub receipt: Receipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RunSettlementRequest {
    /// Settlement period (YYYYWW). Defaults to the current week.
    pub period: Option<i64>,
    #[serde(default)]
    pub dry_run: bool,
}
