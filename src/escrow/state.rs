use chrono::{DateTime, Utc};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// Singleton config account: admin identity plus running totals.
#[derive(Debug, Clone)]
pub struct EscrowConfig {
    pub admin: Pubkey,
    pub total_deposited: u64,
    pub total_disbursed: u64,
    pub total_points_redeemed: u64,
    /// Last settled period (YYYYWW). Strictly advances; a period at or
    /// below this value can never be processed again.
    pub last_processed_week: u64,
}

/// Whitelist entry for a disbursement recipient.
#[derive(Debug, Clone)]
pub struct NgoEntry {
    pub pubkey: Pubkey,
    pub name: String,
    pub total_received: u64,
    pub disbursement_count: u32,
    pub is_active: bool,
}

/// Registry entry for a depositor (brand partner).
#[derive(Debug, Clone)]
pub struct SponsorEntry {
    pub pubkey: Pubkey,
    pub name: String,
    pub total_deposited: u64,
    pub deposit_count: u32,
    pub last_deposit: Option<DateTime<Utc>>,
    pub is_verified: bool,
}

/// Full ledger state. Exists only while the escrow is initialized.
#[derive(Debug)]
pub struct EscrowState {
    pub config: EscrowConfig,
    pub ngos: Vec<NgoEntry>,
    pub sponsors: Vec<SponsorEntry>,
    pub vault_lamports: u64,
}

/// One recipient line in a batch disbursement request.
#[derive(Debug, Clone)]
pub struct BatchAllocation {
    pub ngo: Pubkey,
    pub points_pledged: u64,
}

/// What was actually paid to one NGO within a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementDetail {
    pub ngo: Pubkey,
    pub points_pledged: u64,
    pub lamports_requested: u64,
    pub lamports_paid: u64,
}

/// Committed result of one batch disbursement.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub week_id: u64,
    pub total_points: u64,
    pub total_lamports_requested: u64,
    pub total_lamports_paid: u64,
    /// True when the vault could not cover the full request and every
    /// payout was scaled down proportionally (degraded success).
    pub pro_rata_applied: bool,
    pub disbursements: Vec<DisbursementDetail>,
}

/// Result of a deposit, including attribution when the depositor is a
/// registered sponsor.
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub sponsor: Pubkey,
    pub sponsor_name: Option<String>,
    pub amount: u64,
    pub vault_lamports: u64,
}

/// Read-only snapshot for the admin status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EscrowStatus {
    pub admin: String,
    pub vault_lamports: u64,
    pub total_deposited: u64,
    pub total_disbursed: u64,
    pub total_points_redeemed: u64,
    pub last_processed_week: u64,
    pub ngo_count: usize,
    pub sponsor_count: usize,
}
