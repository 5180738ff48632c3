use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::units;

/// Pledge status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PledgeStatus {
    Pending,
    Completed,
    Failed,
}

impl PledgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PledgeStatus::Pending => "pending",
            PledgeStatus::Completed => "completed",
            PledgeStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PledgeStatus::Pending),
            "completed" => Some(PledgeStatus::Completed),
            "failed" => Some(PledgeStatus::Failed),
            _ => None,
        }
    }

    /// Valid transitions: Pending → Completed | Failed, exactly once.
    /// Terminal states never transition.
    pub fn can_transition(self, to: PledgeStatus) -> bool {
        matches!(
            (self, to),
            (PledgeStatus::Pending, PledgeStatus::Completed)
                | (PledgeStatus::Pending, PledgeStatus::Failed)
        )
    }
}

/// A user's promise to direct points to one NGO in one settlement week.
/// `points` is fixed at creation; the points were debited from the user's
/// balance by the pledge-creation collaborator before this record exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pledge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ngo_id: Uuid,
    pub points: i64,
    pub week_number: i64,
    pub status: PledgeStatus,
    pub receipt_id: Option<Uuid>,
    #[serde(with = "rust_decimal::serde::float")]
    pub usd_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pledge {
    pub fn new(user_id: Uuid, ngo_id: Uuid, points: i64, week_number: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            ngo_id,
            points,
            week_number,
            status: PledgeStatus::Pending,
            receipt_id: None,
            usd_value: units::points_to_usd(points),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Off-chain NGO record mirroring the on-chain whitelist entry, plus the
/// display fields the whitelist does not carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ngo {
    pub id: Uuid,
    pub name: String,
    pub wallet_address: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    pub total_received_lamports: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_received_usd: Decimal,
    pub donation_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ngo {
    pub fn new(name: String, wallet_address: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            wallet_address,
            description: None,
            category: None,
            is_active: true,
            total_received_lamports: 0,
            total_received_usd: Decimal::ZERO,
            donation_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
