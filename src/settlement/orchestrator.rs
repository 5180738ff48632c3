use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppResult, EscrowError, SettlementError};
use crate::pledges::{NgoStore, PledgeStore};
use crate::receipts::{Receipt, ReceiptAllocation, ReceiptStore};
use crate::settlement::aggregator::{Aggregator, Allocation};
use crate::settlement::backend::{SettlementBackend, TxOutcome};
use crate::units;

/// What a dry run would submit, without submitting it.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementPlan {
    pub week_number: i64,
    pub ledger_week_id: u64,
    pub total_points: i64,
    pub total_lamports: u64,
    pub allocations: Vec<PlannedAllocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedAllocation {
    pub ngo_id: Uuid,
    pub ngo_name: String,
    pub points: i64,
    pub lamports: u64,
}

/// Terminal result of one settlement cycle. Every variant is a normal
/// return; the cycle itself only errors on store failures.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Settled { receipt: Receipt },
    AlreadySettled { receipt: Receipt },
    NoPledges { week_number: i64 },
    DryRun { plan: SettlementPlan },
    LedgerFailure {
        week_number: i64,
        reason: String,
        pledges_failed: u64,
    },
}

/// Drives one full settlement cycle: aggregate the week's pending pledges,
/// submit the batch, write the receipt, flip pledge statuses, mirror NGO
/// counters. Safe to invoke repeatedly for the same week; the receipt check
/// and the ledger's period watermark make re-runs no-ops.
pub struct SettlementOrchestrator {
    aggregator: Aggregator,
    pledges: Arc<dyn PledgeStore>,
    ngos: Arc<dyn NgoStore>,
    receipts: Arc<dyn ReceiptStore>,
    backend: Arc<dyn SettlementBackend>,
    submit_timeout: Duration,
    /// Substitute a wall-clock unique ledger period so one calendar week can
    /// be settled repeatedly. Development only.
    dev_unique_period: bool,
}

impl SettlementOrchestrator {
    pub fn new(
        pledges: Arc<dyn PledgeStore>,
        ngos: Arc<dyn NgoStore>,
        receipts: Arc<dyn ReceiptStore>,
        backend: Arc<dyn SettlementBackend>,
        submit_timeout: Duration,
        dev_unique_period: bool,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(pledges.clone(), ngos.clone()),
            pledges,
            ngos,
            receipts,
            backend,
            submit_timeout,
            dev_unique_period,
        }
    }

    /// Run one settlement cycle for `week` (defaults to the current ISO
    /// week). `dry_run` stops short of any mutation and reports the plan.
    pub async fn run_cycle(
        &self,
        week: Option<i64>,
        dry_run: bool,
    ) -> AppResult<SettlementOutcome> {
        let week_number = week.unwrap_or_else(units::current_week_number);

        if let Some(receipt) = self.receipts.find_by_week(week_number).await? {
            info!(week_number, receipt_id = %receipt.id, "week already settled");
            return Ok(SettlementOutcome::AlreadySettled { receipt });
        }

        let allocations = self.aggregator.allocations_for_week(week_number).await?;
        if allocations.is_empty() {
            info!(week_number, "no pending pledges to settle");
            return Ok(SettlementOutcome::NoPledges { week_number });
        }

        let ledger_week_id = if self.dev_unique_period {
            warn!(week_number, "substituting unique ledger period (dev mode)");
            units::unique_dev_period() as u64
        } else {
            week_number as u64
        };

        if dry_run {
            return Ok(SettlementOutcome::DryRun {
                plan: plan_from(week_number, ledger_week_id, &allocations),
            });
        }

        info!(
            week_number,
            ledger_week_id,
            ngos = allocations.len(),
            "submitting weekly settlement batch"
        );

        let submitted =
            tokio::time::timeout(self.submit_timeout, self.backend.submit(ledger_week_id, &allocations))
                .await;

        let outcome = match submitted {
            Err(_) => Err(SettlementError::Timeout),
            Ok(result) => result,
        };

        match outcome {
            Ok(tx) => self.reconcile(week_number, &allocations, tx).await,
            Err(e) => self.handle_failure(week_number, &allocations, e).await,
        }
    }

    /// The receipt is written before any pledge transitions, so a crash in
    /// between leaves a recoverable record of what was paid.
    async fn reconcile(
        &self,
        week_number: i64,
        allocations: &[Allocation],
        tx: TxOutcome,
    ) -> AppResult<SettlementOutcome> {
        let mut receipt_allocations = Vec::with_capacity(allocations.len());
        let mut total_points: i64 = 0;
        let mut total_usd = Decimal::ZERO;
        for (i, allocation) in allocations.iter().enumerate() {
            total_points += allocation.total_points;
            total_usd += allocation.usd;
            receipt_allocations.push(ReceiptAllocation {
                ngo_id: allocation.ngo_id,
                ngo_name: allocation.ngo_name.clone(),
                ngo_wallet: allocation.ngo_wallet.clone(),
                points: allocation.total_points,
                lamports_requested: allocation.lamports,
                lamports_paid: tx.paid[i],
                usd: allocation.usd,
            });
        }

        let receipt = self
            .receipts
            .create(Receipt {
                id: Uuid::new_v4(),
                week_number,
                tx_signature: tx.signature.clone(),
                total_points,
                total_lamports_requested: tx.total_requested as i64,
                total_lamports_paid: tx.total_paid as i64,
                total_usd,
                pro_rata_applied: tx.pro_rata_applied,
                cluster: self.backend.cluster().to_string(),
                allocations: receipt_allocations,
                processed_at: Utc::now(),
            })
            .await?;

        for (i, allocation) in allocations.iter().enumerate() {
            let completed = self
                .pledges
                .mark_completed(&allocation.pledge_ids, receipt.id)
                .await?;
            if completed != allocation.pledge_ids.len() as u64 {
                warn!(
                    ngo_id = %allocation.ngo_id,
                    expected = allocation.pledge_ids.len(),
                    completed,
                    "some pledges were not pending at completion time"
                );
            }
            self.ngos
                .record_disbursement(allocation.ngo_id, tx.paid[i] as i64, allocation.usd)
                .await?;
        }

        info!(
            week_number,
            receipt_id = %receipt.id,
            signature = %receipt.tx_signature,
            total_paid = receipt.total_lamports_paid,
            pro_rata = receipt.pro_rata_applied,
            "settlement cycle complete"
        );
        Ok(SettlementOutcome::Settled { receipt })
    }

    async fn handle_failure(
        &self,
        week_number: i64,
        allocations: &[Allocation],
        e: SettlementError,
    ) -> AppResult<SettlementOutcome> {
        error!(week_number, "settlement submission failed: {}", e);

        match &e {
            // The ledger says this period is settled but we hold no receipt.
            // That is a divergence to investigate, not a reason to fail the
            // pledges; a later manual run with the right period recovers.
            SettlementError::Rejected(EscrowError::WeekAlreadyProcessed) => {
                if let Some(receipt) = self.receipts.find_by_week(week_number).await? {
                    return Ok(SettlementOutcome::AlreadySettled { receipt });
                }
                Ok(SettlementOutcome::LedgerFailure {
                    week_number,
                    reason: e.to_string(),
                    pledges_failed: 0,
                })
            }
            _ => {
                let ids: Vec<Uuid> = allocations
                    .iter()
                    .flat_map(|a| a.pledge_ids.iter().copied())
                    .collect();
                let pledges_failed = self.pledges.mark_failed(&ids).await?;
                Ok(SettlementOutcome::LedgerFailure {
                    week_number,
                    reason: e.to_string(),
                    pledges_failed,
                })
            }
        }
    }
}

fn plan_from(week_number: i64, ledger_week_id: u64, allocations: &[Allocation]) -> SettlementPlan {
    SettlementPlan {
        week_number,
        ledger_week_id,
        total_points: allocations.iter().map(|a| a.total_points).sum(),
        total_lamports: allocations.iter().map(|a| a.lamports).sum(),
        allocations: allocations
            .iter()
            .map(|a| PlannedAllocation {
                ngo_id: a.ngo_id,
                ngo_name: a.ngo_name.clone(),
                points: a.total_points,
                lamports: a.lamports,
            })
            .collect(),
    }
}
