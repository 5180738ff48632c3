use chrono::Utc;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::error::EscrowError;
use crate::escrow::state::{
    BatchAllocation, BatchOutcome, DepositOutcome, DisbursementDetail, EscrowConfig, EscrowState,
    EscrowStatus, NgoEntry, SponsorEntry,
};
use crate::units;

/// The escrow ledger state machine. Externally the ledger is either
/// uninitialized (`None`) or active; every operation takes the single lock
/// for its full duration, so deposits and disbursements serialize and no
/// partial state is ever observable.
///
/// Every operation validates completely before mutating anything: a
/// rejected call leaves the state untouched.
pub struct EscrowLedger {
    inner: Mutex<Option<EscrowState>>,
}

impl Default for EscrowLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Create the vault, both registries and the zeroed config. Callable
    /// exactly once.
    pub fn initialize(&self, admin: Pubkey) -> Result<(), EscrowError> {
        let mut guard = self.inner.lock();
        if guard.is_some() {
            return Err(EscrowError::AlreadyInitialized);
        }
        *guard = Some(EscrowState {
            config: EscrowConfig {
                admin,
                total_deposited: 0,
                total_disbursed: 0,
                total_points_redeemed: 0,
                last_processed_week: 0,
            },
            ngos: Vec::new(),
            sponsors: Vec::new(),
            vault_lamports: 0,
        });
        info!(%admin, "escrow initialized");
        Ok(())
    }

    /// Add `amount` to the vault. Any caller may deposit; registered
    /// sponsors additionally get the deposit attributed to their entry.
    pub fn deposit(&self, sponsor: Pubkey, amount: u64) -> Result<DepositOutcome, EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidAmount);
        }
        let mut guard = self.inner.lock();
        let state = guard.as_mut().ok_or(EscrowError::NotInitialized)?;

        let new_vault = state
            .vault_lamports
            .checked_add(amount)
            .ok_or(EscrowError::Overflow)?;
        let new_total = state
            .config
            .total_deposited
            .checked_add(amount)
            .ok_or(EscrowError::Overflow)?;

        // Precompute sponsor attribution so a counter overflow cannot leave
        // a half-applied deposit.
        let sponsor_update = match state.sponsors.iter().position(|s| s.pubkey == sponsor) {
            Some(idx) => {
                let entry = &state.sponsors[idx];
                let total = entry
                    .total_deposited
                    .checked_add(amount)
                    .ok_or(EscrowError::Overflow)?;
                let count = entry
                    .deposit_count
                    .checked_add(1)
                    .ok_or(EscrowError::Overflow)?;
                Some((idx, total, count))
            }
            None => None,
        };

        state.vault_lamports = new_vault;
        state.config.total_deposited = new_total;
        let sponsor_name = sponsor_update.map(|(idx, total, count)| {
            let entry = &mut state.sponsors[idx];
            entry.total_deposited = total;
            entry.deposit_count = count;
            entry.last_deposit = Some(Utc::now());
            entry.name.clone()
        });

        info!(%sponsor, amount, vault = state.vault_lamports, "deposit received");
        Ok(DepositOutcome {
            sponsor,
            sponsor_name,
            amount,
            vault_lamports: state.vault_lamports,
        })
    }

    /// Whitelist a new NGO. Admin only.
    pub fn add_ngo(&self, caller: Pubkey, ngo: Pubkey, name: String) -> Result<(), EscrowError> {
        let mut guard = self.inner.lock();
        let state = guard.as_mut().ok_or(EscrowError::NotInitialized)?;
        require_admin(state, caller)?;
        if state.ngos.iter().any(|n| n.pubkey == ngo) {
            return Err(EscrowError::NgoAlreadyExists);
        }
        if state.ngos.len() >= units::MAX_NGOS {
            return Err(EscrowError::NgoRegistryFull);
        }
        if name.len() > units::MAX_NAME_LEN {
            return Err(EscrowError::NameTooLong);
        }
        state.ngos.push(NgoEntry {
            pubkey: ngo,
            name,
            total_received: 0,
            disbursement_count: 0,
            is_active: true,
        });
        info!(%ngo, "ngo added to whitelist");
        Ok(())
    }

    /// Deactivate an NGO. Blocks future disbursements, keeps history.
    pub fn remove_ngo(&self, caller: Pubkey, ngo: Pubkey) -> Result<(), EscrowError> {
        let mut guard = self.inner.lock();
        let state = guard.as_mut().ok_or(EscrowError::NotInitialized)?;
        require_admin(state, caller)?;
        let entry = state
            .ngos
            .iter_mut()
            .find(|n| n.pubkey == ngo)
            .ok_or(EscrowError::NgoNotFound)?;
        entry.is_active = false;
        info!(%ngo, "ngo deactivated");
        Ok(())
    }

    /// Register a sponsor so future deposits are attributed. Admin only.
    pub fn register_sponsor(
        &self,
        caller: Pubkey,
        sponsor: Pubkey,
        name: String,
    ) -> Result<(), EscrowError> {
        let mut guard = self.inner.lock();
        let state = guard.as_mut().ok_or(EscrowError::NotInitialized)?;
        require_admin(state, caller)?;
        if state.sponsors.iter().any(|s| s.pubkey == sponsor) {
            return Err(EscrowError::SponsorAlreadyExists);
        }
        if state.sponsors.len() >= units::MAX_SPONSORS {
            return Err(EscrowError::SponsorRegistryFull);
        }
        if name.len() > units::MAX_NAME_LEN {
            return Err(EscrowError::NameTooLong);
        }
        state.sponsors.push(SponsorEntry {
            pubkey: sponsor,
            name,
            total_deposited: 0,
            deposit_count: 0,
            last_deposit: None,
            is_verified: true,
        });
        info!(%sponsor, "sponsor registered");
        Ok(())
    }

    /// Unverify a sponsor. They can still deposit, unattributed history stays.
    pub fn remove_sponsor(&self, caller: Pubkey, sponsor: Pubkey) -> Result<(), EscrowError> {
        let mut guard = self.inner.lock();
        let state = guard.as_mut().ok_or(EscrowError::NotInitialized)?;
        require_admin(state, caller)?;
        let entry = state
            .sponsors
            .iter_mut()
            .find(|s| s.pubkey == sponsor)
            .ok_or(EscrowError::SponsorNotFound)?;
        entry.is_verified = false;
        info!(%sponsor, "sponsor unverified");
        Ok(())
    }

    /// Atomically disburse one weekly batch to whitelisted NGOs.
    ///
    /// `accounts` is the caller-supplied recipient account list and must
    /// match the allocations one-to-one, in order. When the vault cannot
    /// cover the full request, every payout is scaled by
    /// `vault / total_requested` (integer-truncated) and the batch still
    /// commits as a degraded success.
    pub fn batch_disburse(
        &self,
        caller: Pubkey,
        week_id: u64,
        allocations: &[BatchAllocation],
        accounts: &[Pubkey],
    ) -> Result<BatchOutcome, EscrowError> {
        let mut guard = self.inner.lock();
        let state = guard.as_mut().ok_or(EscrowError::NotInitialized)?;
        require_admin(state, caller)?;

        if allocations.is_empty() {
            return Err(EscrowError::EmptyBatch);
        }
        if allocations.len() > units::MAX_BATCH_SIZE {
            return Err(EscrowError::BatchTooLarge);
        }
        // Periods strictly advance; anything at or below the watermark has
        // already been settled (or forfeited its slot).
        if week_id <= state.config.last_processed_week {
            return Err(EscrowError::WeekAlreadyProcessed);
        }
        if accounts.len() != allocations.len() {
            return Err(EscrowError::AccountMismatch);
        }

        // Validation pass: resolve every NGO and precompute every payout and
        // counter update before touching any state.
        let mut total_points: u64 = 0;
        let mut total_requested: u64 = 0;
        let mut requests: Vec<(usize, u64)> = Vec::with_capacity(allocations.len());

        for (i, allocation) in allocations.iter().enumerate() {
            if accounts[i] != allocation.ngo {
                return Err(EscrowError::AccountMismatch);
            }
            let idx = state
                .ngos
                .iter()
                .position(|n| n.pubkey == allocation.ngo)
                .ok_or(EscrowError::NgoNotFound)?;
            if !state.ngos[idx].is_active {
                return Err(EscrowError::NgoNotActive);
            }
            let requested =
                units::points_to_lamports(allocation.points_pledged).ok_or(EscrowError::Overflow)?;
            total_points = total_points
                .checked_add(allocation.points_pledged)
                .ok_or(EscrowError::Overflow)?;
            total_requested = total_requested
                .checked_add(requested)
                .ok_or(EscrowError::Overflow)?;
            requests.push((idx, requested));
        }
        if total_points == 0 {
            return Err(EscrowError::InvalidAmount);
        }

        let vault = state.vault_lamports;
        let pro_rata_applied = total_requested > vault;

        let mut total_paid: u64 = 0;
        let mut updates: Vec<(usize, u64, u64, u32)> = Vec::with_capacity(requests.len());
        let mut disbursements: Vec<DisbursementDetail> = Vec::with_capacity(requests.len());

        for (pos, (idx, requested)) in requests.iter().enumerate() {
            let paid = if pro_rata_applied {
                // Exact proportional share; u128 keeps the product from
                // overflowing before the divide.
                ((*requested as u128 * vault as u128) / total_requested as u128) as u64
            } else {
                *requested
            };
            if paid > 0 {
                let entry = &state.ngos[*idx];
                let new_received = entry
                    .total_received
                    .checked_add(paid)
                    .ok_or(EscrowError::Overflow)?;
                let new_count = entry
                    .disbursement_count
                    .checked_add(1)
                    .ok_or(EscrowError::Overflow)?;
                updates.push((*idx, paid, new_received, new_count));
                total_paid = total_paid.checked_add(paid).ok_or(EscrowError::Overflow)?;
            }
            disbursements.push(DisbursementDetail {
                ngo: allocations[pos].ngo,
                points_pledged: allocations[pos].points_pledged,
                lamports_requested: *requested,
                lamports_paid: paid,
            });
        }

        let new_disbursed = state
            .config
            .total_disbursed
            .checked_add(total_paid)
            .ok_or(EscrowError::Overflow)?;
        let new_points_redeemed = state
            .config
            .total_points_redeemed
            .checked_add(total_points)
            .ok_or(EscrowError::Overflow)?;
        // total_paid <= vault by construction, but keep the invariant explicit.
        let new_vault = vault.checked_sub(total_paid).ok_or(EscrowError::Overflow)?;

        // Commit pass: infallible.
        for (idx, _paid, new_received, new_count) in &updates {
            let entry = &mut state.ngos[*idx];
            entry.total_received = *new_received;
            entry.disbursement_count = *new_count;
        }
        state.vault_lamports = new_vault;
        state.config.total_disbursed = new_disbursed;
        state.config.total_points_redeemed = new_points_redeemed;
        state.config.last_processed_week = week_id;

        info!(
            week_id,
            total_points,
            total_requested,
            total_paid,
            pro_rata_applied,
            ngos = allocations.len(),
            "batch disbursement committed"
        );

        Ok(BatchOutcome {
            week_id,
            total_points,
            total_lamports_requested: total_requested,
            total_lamports_paid: total_paid,
            pro_rata_applied,
            disbursements,
        })
    }

    /// Read-only snapshot of config counters, vault and registry sizes.
    pub fn status(&self) -> Result<EscrowStatus, EscrowError> {
        let guard = self.inner.lock();
        let state = guard.as_ref().ok_or(EscrowError::NotInitialized)?;
        Ok(EscrowStatus {
            admin: state.config.admin.to_string(),
            vault_lamports: state.vault_lamports,
            total_deposited: state.config.total_deposited,
            total_disbursed: state.config.total_disbursed,
            total_points_redeemed: state.config.total_points_redeemed,
            last_processed_week: state.config.last_processed_week,
            ngo_count: state.ngos.len(),
            sponsor_count: state.sponsors.len(),
        })
    }

    /// Cumulative totals for one NGO, if whitelisted.
    pub fn ngo_totals(&self, ngo: Pubkey) -> Result<(u64, u32, bool), EscrowError> {
        let guard = self.inner.lock();
        let state = guard.as_ref().ok_or(EscrowError::NotInitialized)?;
        let entry = state
            .ngos
            .iter()
            .find(|n| n.pubkey == ngo)
            .ok_or(EscrowError::NgoNotFound)?;
        Ok((entry.total_received, entry.disbursement_count, entry.is_active))
    }
}

fn require_admin(state: &EscrowState, caller: Pubkey) -> Result<(), EscrowError> {
    if caller != state.config.admin {
        return Err(EscrowError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with_admin() -> (EscrowLedger, Pubkey) {
        let ledger = EscrowLedger::new();
        let admin = Pubkey::new_unique();
        ledger.initialize(admin).unwrap();
        (ledger, admin)
    }

    fn add_active_ngo(ledger: &EscrowLedger, admin: Pubkey, name: &str) -> Pubkey {
        let ngo = Pubkey::new_unique();
        ledger.add_ngo(admin, ngo, name.to_string()).unwrap();
        ngo
    }

    fn batch(ngos: &[(Pubkey, u64)]) -> (Vec<BatchAllocation>, Vec<Pubkey>) {
        let allocations = ngos
            .iter()
            .map(|(ngo, points)| BatchAllocation {
                ngo: *ngo,
                points_pledged: *points,
            })
            .collect();
        let accounts = ngos.iter().map(|(ngo, _)| *ngo).collect();
        (allocations, accounts)
    }

    #[test]
    fn test_initialize_once() {
        let ledger = EscrowLedger::new();
        let admin = Pubkey::new_unique();
        assert!(ledger.initialize(admin).is_ok());
        assert_eq!(
            ledger.initialize(admin),
            Err(EscrowError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_uninitialized_operations_fail() {
        let ledger = EscrowLedger::new();
        let caller = Pubkey::new_unique();
        assert_eq!(
            ledger.deposit(caller, 100).unwrap_err(),
            EscrowError::NotInitialized
        );
        assert_eq!(ledger.status().unwrap_err(), EscrowError::NotInitialized);
    }

    #[test]
    fn test_deposit_rejects_zero() {
        let (ledger, _) = ledger_with_admin();
        assert_eq!(
            ledger.deposit(Pubkey::new_unique(), 0).unwrap_err(),
            EscrowError::InvalidAmount
        );
    }

    #[test]
    fn test_deposit_from_unregistered_sponsor_still_funds_vault() {
        let (ledger, _) = ledger_with_admin();
        let outcome = ledger.deposit(Pubkey::new_unique(), 5_000).unwrap();
        assert_eq!(outcome.sponsor_name, None);
        assert_eq!(outcome.vault_lamports, 5_000);
        assert_eq!(ledger.status().unwrap().total_deposited, 5_000);
    }

    #[test]
    fn test_deposit_attribution_for_registered_sponsor() {
        let (ledger, admin) = ledger_with_admin();
        let sponsor = Pubkey::new_unique();
        ledger
            .register_sponsor(admin, sponsor, "GreenBrand".to_string())
            .unwrap();

        let outcome = ledger.deposit(sponsor, 1_000).unwrap();
        assert_eq!(outcome.sponsor_name.as_deref(), Some("GreenBrand"));
        ledger.deposit(sponsor, 500).unwrap();

        let status = ledger.status().unwrap();
        assert_eq!(status.vault_lamports, 1_500);
        assert_eq!(status.total_deposited, 1_500);
    }

    #[test]
    fn test_registry_admin_only() {
        let (ledger, _) = ledger_with_admin();
        let intruder = Pubkey::new_unique();
        assert_eq!(
            ledger
                .add_ngo(intruder, Pubkey::new_unique(), "Oceans".to_string())
                .unwrap_err(),
            EscrowError::Unauthorized
        );
        assert_eq!(
            ledger
                .register_sponsor(intruder, Pubkey::new_unique(), "Brand".to_string())
                .unwrap_err(),
            EscrowError::Unauthorized
        );
    }

    #[test]
    fn test_duplicate_registry_entries_rejected() {
        let (ledger, admin) = ledger_with_admin();
        let ngo = add_active_ngo(&ledger, admin, "Rivers");
        assert_eq!(
            ledger.add_ngo(admin, ngo, "Rivers again".to_string()).unwrap_err(),
            EscrowError::NgoAlreadyExists
        );
    }

    #[test]
    fn test_name_too_long_rejected() {
        let (ledger, admin) = ledger_with_admin();
        let name = "x".repeat(65);
        assert_eq!(
            ledger.add_ngo(admin, Pubkey::new_unique(), name).unwrap_err(),
            EscrowError::NameTooLong
        );
    }

    #[test]
    fn test_full_batch_conservation() {
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "Forests");
        let b = add_active_ngo(&ledger, admin, "Oceans");
        ledger.deposit(Pubkey::new_unique(), 1_000_000_000).unwrap();

        let (allocations, accounts) = batch(&[(a, 1_000), (b, 3_000)]);
        let outcome = ledger
            .batch_disburse(admin, 202610, &allocations, &accounts)
            .unwrap();

        assert!(!outcome.pro_rata_applied);
        // 1000 pts -> 0.05 SOL, 3000 pts -> 0.15 SOL.
        assert_eq!(outcome.total_lamports_requested, 200_000_000);
        assert_eq!(outcome.total_lamports_paid, 200_000_000);
        assert_eq!(outcome.disbursements[0].lamports_paid, 50_000_000);
        assert_eq!(outcome.disbursements[1].lamports_paid, 150_000_000);

        let status = ledger.status().unwrap();
        assert_eq!(status.vault_lamports, 800_000_000);
        assert_eq!(status.total_disbursed, 200_000_000);
        assert_eq!(status.total_points_redeemed, 4_000);
        assert_eq!(status.last_processed_week, 202610);

        assert_eq!(ledger.ngo_totals(a).unwrap(), (50_000_000, 1, true));
        assert_eq!(ledger.ngo_totals(b).unwrap(), (150_000_000, 1, true));
    }

    #[test]
    fn test_pro_rata_exhausts_vault_fairly() {
        // Spec scenario: vault 1.0 SOL, two requests of 0.6 SOL each.
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "A");
        let b = add_active_ngo(&ledger, admin, "B");
        ledger.deposit(Pubkey::new_unique(), 1_000_000_000).unwrap();

        // 12_000 points = 0.6 SOL each.
        let (allocations, accounts) = batch(&[(a, 12_000), (b, 12_000)]);
        let outcome = ledger
            .batch_disburse(admin, 202611, &allocations, &accounts)
            .unwrap();

        assert!(outcome.pro_rata_applied);
        assert_eq!(outcome.disbursements[0].lamports_paid, 500_000_000);
        assert_eq!(outcome.disbursements[1].lamports_paid, 500_000_000);
        assert_eq!(outcome.total_lamports_paid, 1_000_000_000);
        assert_eq!(ledger.status().unwrap().vault_lamports, 0);
    }

    #[test]
    fn test_pro_rata_ratio_within_one_unit() {
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "A");
        let b = add_active_ngo(&ledger, admin, "B");
        let c = add_active_ngo(&ledger, admin, "C");
        ledger.deposit(Pubkey::new_unique(), 123_456_789).unwrap();

        let (allocations, accounts) = batch(&[(a, 700), (b, 1_900), (c, 5_400)]);
        let outcome = ledger
            .batch_disburse(admin, 202612, &allocations, &accounts)
            .unwrap();
        assert!(outcome.pro_rata_applied);

        let vault_before = 123_456_789u128;
        let total_requested = outcome.total_lamports_requested as u128;
        for d in &outcome.disbursements {
            let exact = d.lamports_requested as u128 * vault_before / total_requested;
            assert_eq!(d.lamports_paid as u128, exact);
        }
        // Truncation may strand at most a few lamports, never more than one
        // per allocation.
        let status = ledger.status().unwrap();
        assert!(status.vault_lamports < outcome.disbursements.len() as u64 + 1);
    }

    #[test]
    fn test_batch_atomic_abort_on_inactive_ngo() {
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "A");
        let b = add_active_ngo(&ledger, admin, "B");
        ledger.deposit(Pubkey::new_unique(), 1_000_000_000).unwrap();
        ledger.remove_ngo(admin, b).unwrap();

        let (allocations, accounts) = batch(&[(a, 1_000), (b, 1_000)]);
        assert_eq!(
            ledger
                .batch_disburse(admin, 202613, &allocations, &accounts)
                .unwrap_err(),
            EscrowError::NgoNotActive
        );

        // Nothing committed, not even the first allocation.
        let status = ledger.status().unwrap();
        assert_eq!(status.vault_lamports, 1_000_000_000);
        assert_eq!(status.total_disbursed, 0);
        assert_eq!(status.last_processed_week, 0);
        assert_eq!(ledger.ngo_totals(a).unwrap(), (0, 0, true));
    }

    #[test]
    fn test_batch_rejects_unknown_recipient() {
        let (ledger, admin) = ledger_with_admin();
        ledger.deposit(Pubkey::new_unique(), 1_000_000_000).unwrap();
        let stranger = Pubkey::new_unique();
        let (allocations, accounts) = batch(&[(stranger, 1_000)]);
        assert_eq!(
            ledger
                .batch_disburse(admin, 202614, &allocations, &accounts)
                .unwrap_err(),
            EscrowError::NgoNotFound
        );
    }

    #[test]
    fn test_batch_account_mismatch() {
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "A");
        let b = add_active_ngo(&ledger, admin, "B");
        ledger.deposit(Pubkey::new_unique(), 1_000_000_000).unwrap();

        let (allocations, _) = batch(&[(a, 1_000), (b, 1_000)]);
        // Accounts supplied in the wrong order.
        let err = ledger
            .batch_disburse(admin, 202615, &allocations, &[b, a])
            .unwrap_err();
        assert_eq!(err, EscrowError::AccountMismatch);

        // Accounts list of the wrong length.
        let err = ledger
            .batch_disburse(admin, 202615, &allocations, &[a])
            .unwrap_err();
        assert_eq!(err, EscrowError::AccountMismatch);
    }

    #[test]
    fn test_week_guard_strictly_advances() {
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "A");
        ledger.deposit(Pubkey::new_unique(), 1_000_000_000).unwrap();

        let (allocations, accounts) = batch(&[(a, 1_000)]);
        ledger
            .batch_disburse(admin, 202620, &allocations, &accounts)
            .unwrap();

        // Same week and an older week are both rejected.
        for week in [202620, 202619] {
            assert_eq!(
                ledger
                    .batch_disburse(admin, week, &allocations, &accounts)
                    .unwrap_err(),
                EscrowError::WeekAlreadyProcessed
            );
        }
        // A later week is fine.
        assert!(ledger
            .batch_disburse(admin, 202621, &allocations, &accounts)
            .is_ok());
    }

    #[test]
    fn test_batch_requires_admin_and_rejects_empty() {
        let (ledger, admin) = ledger_with_admin();
        let a = add_active_ngo(&ledger, admin, "A");
        let (allocations, accounts) = batch(&[(a, 1_000)]);

        assert_eq!(
            ledger
                .batch_disburse(Pubkey::new_unique(), 202616, &allocations, &accounts)
                .unwrap_err(),
            EscrowError::Unauthorized
        );
        assert_eq!(
            ledger
                .batch_disburse(admin, 202616, &[], &[])
                .unwrap_err(),
            EscrowError::EmptyBatch
        );
    }

    #[test]
    fn test_batch_too_large() {
        let (ledger, admin) = ledger_with_admin();
        let ngos: Vec<(Pubkey, u64)> = (0..11)
            .map(|i| (add_active_ngo(&ledger, admin, &format!("N{}", i)), 1_000))
            .collect();
        let (allocations, accounts) = batch(&ngos);
        assert_eq!(
            ledger
                .batch_disburse(admin, 202617, &allocations, &accounts)
                .unwrap_err(),
            EscrowError::BatchTooLarge
        );
    }

    #[test]
    fn test_deactivated_sponsor_keeps_history() {
        let (ledger, admin) = ledger_with_admin();
        let sponsor = Pubkey::new_unique();
        ledger
            .register_sponsor(admin, sponsor, "Brand".to_string())
            .unwrap();
        ledger.deposit(sponsor, 700).unwrap();
        ledger.remove_sponsor(admin, sponsor).unwrap();

        // Unverified sponsors can still deposit and history remains.
        let outcome = ledger.deposit(sponsor, 300).unwrap();
        assert_eq!(outcome.vault_lamports, 1_000);
        assert_eq!(ledger.status().unwrap().sponsor_count, 1);
    }
}
