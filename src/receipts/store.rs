use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::receipts::models::Receipt;

/// Receipt persistence. Receipts are append-only; there is no update or
/// delete. Creation must reject a duplicate week or a duplicate transaction
/// signature, which is what makes the weekly cycle safe to re-run.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn create(&self, receipt: Receipt) -> AppResult<Receipt>;
    async fn find(&self, id: Uuid) -> AppResult<Option<Receipt>>;
    async fn find_by_week(&self, week_number: i64) -> AppResult<Option<Receipt>>;
    async fn find_by_signature(&self, signature: &str) -> AppResult<Option<Receipt>>;
    /// Most recent receipts first.
    async fn list(&self, limit: i64) -> AppResult<Vec<Receipt>>;
}

/// In-memory receipt store for tests and demo deployments.
#[derive(Default)]
pub struct InMemoryReceiptStore {
    rows: RwLock<HashMap<Uuid, Receipt>>,
}

impl InMemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn create(&self, receipt: Receipt) -> AppResult<Receipt> {
        let mut rows = self.rows.write();
        if rows
            .values()
            .any(|r| r.week_number == receipt.week_number || r.tx_signature == receipt.tx_signature)
        {
            return Err(AppError::AlreadyExists(format!(
                "receipt for week {}",
                receipt.week_number
            )));
        }
        rows.insert(receipt.id, receipt.clone());
        Ok(receipt)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Receipt>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn find_by_week(&self, week_number: i64) -> AppResult<Option<Receipt>> {
        Ok(self
            .rows
            .read()
            .values()
            .find(|r| r.week_number == week_number)
            .cloned())
    }

    async fn find_by_signature(&self, signature: &str) -> AppResult<Option<Receipt>> {
        Ok(self
            .rows
            .read()
            .values()
            .find(|r| r.tx_signature == signature)
            .cloned())
    }

    async fn list(&self, limit: i64) -> AppResult<Vec<Receipt>> {
        let mut receipts: Vec<Receipt> = self.rows.read().values().cloned().collect();
        receipts.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        receipts.truncate(limit.max(0) as usize);
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn receipt(week: i64, sig: &str) -> Receipt {
        Receipt {
            id: Uuid::new_v4(),
            week_number: week,
            tx_signature: sig.to_string(),
            total_points: 1_000,
            total_lamports_requested: 50_000_000,
            total_lamports_paid: 50_000_000,
            total_usd: Decimal::from(10),
            pro_rata_applied: false,
            cluster: "ledger".to_string(),
            allocations: vec![],
            processed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_week_rejected() {
        let store = InMemoryReceiptStore::new();
        store.create(receipt(202610, "sig_a")).await.unwrap();
        let dup = store.create(receipt(202610, "sig_b")).await;
        assert!(matches!(dup, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_duplicate_signature_rejected() {
        let store = InMemoryReceiptStore::new();
        store.create(receipt(202610, "sig_a")).await.unwrap();
        let dup = store.create(receipt(202611, "sig_a")).await;
        assert!(matches!(dup, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let store = InMemoryReceiptStore::new();
        let mut old = receipt(202609, "sig_a");
        old.processed_at = Utc::now() - Duration::days(7);
        store.create(old).await.unwrap();
        let newer = store.create(receipt(202610, "sig_b")).await.unwrap();

        let listed = store.list(1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_find_by_week_and_signature() {
        let store = InMemoryReceiptStore::new();
        let created = store.create(receipt(202610, "sig_a")).await.unwrap();

        let by_week = store.find_by_week(202610).await.unwrap().unwrap();
        assert_eq!(by_week.id, created.id);
        let by_sig = store.find_by_signature("sig_a").await.unwrap().unwrap();
        assert_eq!(by_sig.id, created.id);
        assert!(store.find_by_week(202611).await.unwrap().is_none());
    }
}
