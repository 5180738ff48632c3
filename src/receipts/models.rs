use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-NGO line item within a settlement receipt. `lamports_paid` can be
/// below `lamports_requested` when the vault forced a pro-rata cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptAllocation {
    pub ngo_id: Uuid,
    pub ngo_name: String,
    pub ngo_wallet: String,
    pub points: i64,
    pub lamports_requested: u64,
    pub lamports_paid: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub usd: Decimal,
}

/// Immutable record of one settled week. Written exactly once, after the
/// ledger transaction confirmed and before any pledge is marked completed,
/// so a crash between the two leaves a receipt to recover from rather than
/// a paid-but-unrecorded week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub week_number: i64,
    pub tx_signature: String,
    pub total_points: i64,
    pub total_lamports_requested: i64,
    pub total_lamports_paid: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_usd: Decimal,
    pub pro_rata_applied: bool,
    pub cluster: String,
    pub allocations: Vec<ReceiptAllocation>,
    pub processed_at: DateTime<Utc>,
}
