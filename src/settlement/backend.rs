use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::error::SettlementError;
use crate::escrow::{BatchAllocation, EscrowLedger, EscrowStatus};
use crate::settlement::aggregator::Allocation;

/// Result of one confirmed batch submission. `paid` is index-aligned with
/// the submitted allocations; entries can be below the requested lamports
/// when the vault forced a pro-rata cut.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub signature: String,
    pub paid: Vec<u64>,
    pub total_requested: u64,
    pub total_paid: u64,
    pub pro_rata_applied: bool,
}

/// The settlement-layer boundary. The orchestrator only ever talks to this
/// trait; whether the batch lands on the in-process escrow ledger or on a
/// Solana cluster is a deployment decision.
#[async_trait]
pub trait SettlementBackend: Send + Sync {
    /// Cluster label recorded on receipts ("ledger", "devnet", ...).
    fn cluster(&self) -> &str;

    async fn vault_balance(&self) -> Result<u64, SettlementError>;

    async fn status(&self) -> Result<EscrowStatus, SettlementError>;

    /// Submit one weekly batch and wait for it to commit. A `Rejected`
    /// error means the ledger validated and refused; nothing was paid.
    async fn submit(
        &self,
        week_id: u64,
        allocations: &[Allocation],
    ) -> Result<TxOutcome, SettlementError>;
}

/// Backend over the in-process escrow ledger. Used by demo deployments and
/// by every settlement test; behaves exactly like the on-chain program,
/// minus the network.
pub struct LedgerBackend {
    ledger: Arc<EscrowLedger>,
    admin: Pubkey,
    sequence: AtomicU64,
}

impl LedgerBackend {
    pub fn new(ledger: Arc<EscrowLedger>, admin: Pubkey) -> Self {
        Self {
            ledger,
            admin,
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl SettlementBackend for LedgerBackend {
    fn cluster(&self) -> &str {
        "ledger"
    }

    async fn vault_balance(&self) -> Result<u64, SettlementError> {
        Ok(self.ledger.status()?.vault_lamports)
    }

    async fn status(&self) -> Result<EscrowStatus, SettlementError> {
        Ok(self.ledger.status()?)
    }

    async fn submit(
        &self,
        week_id: u64,
        allocations: &[Allocation],
    ) -> Result<TxOutcome, SettlementError> {
        let mut batch = Vec::with_capacity(allocations.len());
        let mut accounts = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let ngo = Pubkey::from_str(&allocation.ngo_wallet)
                .map_err(|_| SettlementError::InvalidAddress(allocation.ngo_wallet.clone()))?;
            batch.push(BatchAllocation {
                ngo,
                points_pledged: allocation.total_points as u64,
            });
            accounts.push(ngo);
        }

        let outcome = self
            .ledger
            .batch_disburse(self.admin, week_id, &batch, &accounts)?;

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(TxOutcome {
            signature: format!("SIM_{}_{:04}", week_id, seq),
            paid: outcome.disbursements.iter().map(|d| d.lamports_paid).collect(),
            total_requested: outcome.total_lamports_requested,
            total_paid: outcome.total_lamports_paid,
            pro_rata_applied: outcome.pro_rata_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn allocation(wallet: &Pubkey, points: i64) -> Allocation {
        Allocation {
            ngo_id: Uuid::new_v4(),
            ngo_name: "N".to_string(),
            ngo_wallet: wallet.to_string(),
            total_points: points,
            lamports: crate::units::points_to_lamports(points as u64).unwrap(),
            usd: Decimal::ZERO,
            pledge_ids: vec![],
        }
    }

    fn funded_backend(vault: u64) -> (LedgerBackend, Pubkey) {
        let ledger = Arc::new(EscrowLedger::new());
        let admin = Pubkey::new_unique();
        ledger.initialize(admin).unwrap();
        ledger.deposit(Pubkey::new_unique(), vault).unwrap();
        (LedgerBackend::new(ledger, admin), admin)
    }

    #[tokio::test]
    async fn test_submit_pays_whitelisted_ngos() {
        let (backend, admin) = funded_backend(1_000_000_000);
        let ngo = Pubkey::new_unique();
        backend.ledger.add_ngo(admin, ngo, "A".to_string()).unwrap();

        let outcome = backend.submit(202610, &[allocation(&ngo, 1_000)]).await.unwrap();
        assert_eq!(outcome.paid, vec![50_000_000]);
        assert_eq!(outcome.total_paid, 50_000_000);
        assert!(!outcome.pro_rata_applied);
        assert!(outcome.signature.starts_with("SIM_202610_"));
        assert_eq!(backend.vault_balance().await.unwrap(), 950_000_000);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_wallet() {
        let (backend, _) = funded_backend(1_000_000_000);
        let mut bad = allocation(&Pubkey::new_unique(), 1_000);
        bad.ngo_wallet = "garbage".to_string();

        let err = backend.submit(202610, &[bad]).await.unwrap_err();
        assert!(matches!(err, SettlementError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_signatures_are_unique_per_submission() {
        let (backend, admin) = funded_backend(1_000_000_000);
        let ngo = Pubkey::new_unique();
        backend.ledger.add_ngo(admin, ngo, "A".to_string()).unwrap();

        let first = backend.submit(202610, &[allocation(&ngo, 1_000)]).await.unwrap();
        let second = backend.submit(202611, &[allocation(&ngo, 1_000)]).await.unwrap();
        assert_ne!(first.signature, second.signature);
    }
}
