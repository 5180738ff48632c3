use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pledges::models::{Ngo, Pledge, PledgeStatus};

/// Pledge persistence. Pledges are never deleted; the only mutation the
/// store permits is the single pending → completed/failed transition driven
/// by the settlement orchestrator.
#[async_trait]
pub trait PledgeStore: Send + Sync {
    async fn create(&self, pledge: Pledge) -> AppResult<Pledge>;
    async fn find(&self, id: Uuid) -> AppResult<Option<Pledge>>;
    /// All pending pledges for one settlement week.
    async fn pending_for_week(&self, week_number: i64) -> AppResult<Vec<Pledge>>;
    /// Transition the given pending pledges to completed, stamping the
    /// receipt. Returns the number of rows that transitioned.
    async fn mark_completed(&self, ids: &[Uuid], receipt_id: Uuid) -> AppResult<u64>;
    /// Transition the given pending pledges to failed.
    async fn mark_failed(&self, ids: &[Uuid]) -> AppResult<u64>;
}

/// NGO registry mirror for the off-chain side.
#[async_trait]
pub trait NgoStore: Send + Sync {
    async fn create(&self, ngo: Ngo) -> AppResult<Ngo>;
    async fn find(&self, id: Uuid) -> AppResult<Option<Ngo>>;
    async fn list(&self) -> AppResult<Vec<Ngo>>;
    async fn list_active(&self) -> AppResult<Vec<Ngo>>;
    /// Mirror a committed ledger payout into the off-chain counters.
    async fn record_disbursement(&self, id: Uuid, lamports: i64, usd: Decimal) -> AppResult<()>;
}

/// In-memory pledge store for tests and demo deployments.
#[derive(Default)]
pub struct InMemoryPledgeStore {
    rows: RwLock<HashMap<Uuid, Pledge>>,
}

impl InMemoryPledgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PledgeStore for InMemoryPledgeStore {
    async fn create(&self, pledge: Pledge) -> AppResult<Pledge> {
        let mut rows = self.rows.write();
        if rows.contains_key(&pledge.id) {
            return Err(AppError::AlreadyExists(format!("pledge {}", pledge.id)));
        }
        rows.insert(pledge.id, pledge.clone());
        Ok(pledge)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Pledge>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn pending_for_week(&self, week_number: i64) -> AppResult<Vec<Pledge>> {
        let mut pledges: Vec<Pledge> = self
            .rows
            .read()
            .values()
            .filter(|p| p.week_number == week_number && p.status == PledgeStatus::Pending)
            .cloned()
            .collect();
        pledges.sort_by_key(|p| p.created_at);
        Ok(pledges)
    }

    async fn mark_completed(&self, ids: &[Uuid], receipt_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.write();
        let mut updated = 0;
        for id in ids {
            if let Some(pledge) = rows.get_mut(id) {
                if pledge.status.can_transition(PledgeStatus::Completed) {
                    pledge.status = PledgeStatus::Completed;
                    pledge.receipt_id = Some(receipt_id);
                    pledge.updated_at = chrono::Utc::now();
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn mark_failed(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut rows = self.rows.write();
        let mut updated = 0;
        for id in ids {
            if let Some(pledge) = rows.get_mut(id) {
                if pledge.status.can_transition(PledgeStatus::Failed) {
                    pledge.status = PledgeStatus::Failed;
                    pledge.updated_at = chrono::Utc::now();
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }
}

/// In-memory NGO store for tests and demo deployments.
#[derive(Default)]
pub struct InMemoryNgoStore {
    rows: RwLock<HashMap<Uuid, Ngo>>,
}

impl InMemoryNgoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NgoStore for InMemoryNgoStore {
    async fn create(&self, ngo: Ngo) -> AppResult<Ngo> {
        let mut rows = self.rows.write();
        if rows.values().any(|n| n.wallet_address == ngo.wallet_address) {
            return Err(AppError::AlreadyExists(format!(
                "ngo wallet {}",
                ngo.wallet_address
            )));
        }
        rows.insert(ngo.id, ngo.clone());
        Ok(ngo)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Ngo>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Ngo>> {
        let mut ngos: Vec<Ngo> = self.rows.read().values().cloned().collect();
        ngos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ngos)
    }

    async fn list_active(&self) -> AppResult<Vec<Ngo>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|n| n.is_active)
            .collect())
    }

    async fn record_disbursement(&self, id: Uuid, lamports: i64, usd: Decimal) -> AppResult<()> {
        let mut rows = self.rows.write();
        let ngo = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("ngo {}", id)))?;
        ngo.total_received_lamports += lamports;
        ngo.total_received_usd += usd;
        ngo.donation_count += 1;
        ngo.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_for_week_filters_status_and_week() {
        let store = InMemoryPledgeStore::new();
        let user = Uuid::new_v4();
        let ngo = Uuid::new_v4();

        let this_week = store
            .create(Pledge::new(user, ngo, 500, 202610))
            .await
            .unwrap();
        store
            .create(Pledge::new(user, ngo, 800, 202611))
            .await
            .unwrap();
        let mut failed = Pledge::new(user, ngo, 600, 202610);
        failed.status = PledgeStatus::Failed;
        store.create(failed).await.unwrap();

        let pending = store.pending_for_week(202610).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, this_week.id);
    }

    #[tokio::test]
    async fn test_mark_completed_only_touches_pending() {
        let store = InMemoryPledgeStore::new();
        let pledge = store
            .create(Pledge::new(Uuid::new_v4(), Uuid::new_v4(), 500, 202610))
            .await
            .unwrap();
        let receipt = Uuid::new_v4();

        assert_eq!(store.mark_completed(&[pledge.id], receipt).await.unwrap(), 1);
        // A second transition attempt is a no-op: terminal states are final.
        assert_eq!(store.mark_completed(&[pledge.id], receipt).await.unwrap(), 0);
        assert_eq!(store.mark_failed(&[pledge.id]).await.unwrap(), 0);

        let stored = store.find(pledge.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PledgeStatus::Completed);
        assert_eq!(stored.receipt_id, Some(receipt));
    }

    #[tokio::test]
    async fn test_ngo_wallet_uniqueness() {
        let store = InMemoryNgoStore::new();
        store
            .create(Ngo::new("A".to_string(), "wallet1".to_string()))
            .await
            .unwrap();
        let dup = store
            .create(Ngo::new("B".to_string(), "wallet1".to_string()))
            .await;
        assert!(matches!(dup, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_record_disbursement_accumulates() {
        let store = InMemoryNgoStore::new();
        let ngo = store
            .create(Ngo::new("A".to_string(), "wallet1".to_string()))
            .await
            .unwrap();
        store
            .record_disbursement(ngo.id, 50_000_000, Decimal::from(10))
            .await
            .unwrap();
        store
            .record_disbursement(ngo.id, 25_000_000, Decimal::from(5))
            .await
            .unwrap();

        let stored = store.find(ngo.id).await.unwrap().unwrap();
        assert_eq!(stored.total_received_lamports, 75_000_000);
        assert_eq!(stored.total_received_usd, Decimal::from(15));
        assert_eq!(stored.donation_count, 2);
    }
}
