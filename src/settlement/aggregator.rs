use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pledges::{Ngo, Pledge, NgoStore, PledgeStore};
use crate::units;

/// One NGO's aggregated share of a settlement week. Carries the pledge ids
/// that fed it so their status can be flipped after the batch lands.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub ngo_id: Uuid,
    pub ngo_name: String,
    pub ngo_wallet: String,
    pub total_points: i64,
    pub lamports: u64,
    pub usd: Decimal,
    pub pledge_ids: Vec<Uuid>,
}

/// Groups pending pledges into per-NGO allocations, pure aside from the
/// store reads. Pledges against unknown, inactive, or badly-addressed NGOs
/// are left pending and logged; they are picked up again once the NGO
/// record is fixed.
pub struct Aggregator {
    pledges: Arc<dyn PledgeStore>,
    ngos: Arc<dyn NgoStore>,
}

impl Aggregator {
    pub fn new(pledges: Arc<dyn PledgeStore>, ngos: Arc<dyn NgoStore>) -> Self {
        Self { pledges, ngos }
    }

    pub async fn allocations_for_week(&self, week_number: i64) -> AppResult<Vec<Allocation>> {
        let pending = self.pledges.pending_for_week(week_number).await?;
        let active: HashMap<Uuid, Ngo> = self
            .ngos
            .list_active()
            .await?
            .into_iter()
            .map(|n| (n.id, n))
            .collect();
        build_allocations(&pending, &active)
    }
}

pub fn build_allocations(
    pledges: &[Pledge],
    active_ngos: &HashMap<Uuid, Ngo>,
) -> AppResult<Vec<Allocation>> {
    // BTreeMap keyed by NGO id keeps the batch order deterministic, which
    // the ledger's account-order check depends on.
    let mut grouped: BTreeMap<Uuid, (i64, Vec<Uuid>)> = BTreeMap::new();

    for pledge in pledges {
        let ngo = match active_ngos.get(&pledge.ngo_id) {
            Some(ngo) => ngo,
            None => {
                warn!(
                    pledge_id = %pledge.id,
                    ngo_id = %pledge.ngo_id,
                    "skipping pledge against unknown or inactive ngo"
                );
                continue;
            }
        };
        if Pubkey::from_str(&ngo.wallet_address).is_err() {
            warn!(
                pledge_id = %pledge.id,
                ngo_id = %ngo.id,
                wallet = %ngo.wallet_address,
                "skipping pledge, ngo wallet address is not a valid pubkey"
            );
            continue;
        }

        let entry = grouped.entry(pledge.ngo_id).or_insert((0, Vec::new()));
        entry.0 = entry
            .0
            .checked_add(pledge.points)
            .ok_or_else(|| AppError::Internal("pledge points overflow".to_string()))?;
        entry.1.push(pledge.id);
    }

    let mut allocations = Vec::with_capacity(grouped.len());
    for (ngo_id, (total_points, pledge_ids)) in grouped {
        let ngo = &active_ngos[&ngo_id];
        let lamports = units::points_to_lamports(total_points as u64)
            .ok_or_else(|| AppError::Internal("lamport conversion overflow".to_string()))?;
        allocations.push(Allocation {
            ngo_id,
            ngo_name: ngo.name.clone(),
            ngo_wallet: ngo.wallet_address.clone(),
            total_points,
            lamports,
            usd: units::points_to_usd(total_points),
            pledge_ids,
        });
    }
    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{Keypair, Signer};

    fn ngo(name: &str) -> Ngo {
        Ngo::new(name.to_string(), Keypair::new().pubkey().to_string())
    }

    #[test]
    fn test_groups_pledges_per_ngo() {
        let a = ngo("Alpha");
        let b = ngo("Beta");
        let user = Uuid::new_v4();
        let pledges = vec![
            Pledge::new(user, a.id, 3_000, 202610),
            Pledge::new(user, a.id, 2_000, 202610),
            Pledge::new(user, b.id, 1_500, 202610),
        ];
        let active: HashMap<Uuid, Ngo> = [(a.id, a.clone()), (b.id, b.clone())].into();

        let allocations = build_allocations(&pledges, &active).unwrap();
        assert_eq!(allocations.len(), 2);

        let alpha = allocations.iter().find(|x| x.ngo_id == a.id).unwrap();
        assert_eq!(alpha.total_points, 5_000);
        assert_eq!(alpha.lamports, 250_000_000);
        assert_eq!(alpha.usd, Decimal::from(50));
        assert_eq!(alpha.pledge_ids.len(), 2);

        let beta = allocations.iter().find(|x| x.ngo_id == b.id).unwrap();
        assert_eq!(beta.total_points, 1_500);
        assert_eq!(beta.lamports, 75_000_000);
    }

    #[test]
    fn test_skips_inactive_and_unknown_ngos() {
        let mut inactive = ngo("Gone");
        inactive.is_active = false;
        let live = ngo("Live");
        let user = Uuid::new_v4();
        let pledges = vec![
            Pledge::new(user, inactive.id, 1_000, 202610),
            Pledge::new(user, Uuid::new_v4(), 1_000, 202610),
            Pledge::new(user, live.id, 1_000, 202610),
        ];
        // Only active NGOs reach the aggregator.
        let active: HashMap<Uuid, Ngo> = [(live.id, live.clone())].into();

        let allocations = build_allocations(&pledges, &active).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].ngo_id, live.id);
    }

    #[test]
    fn test_skips_invalid_wallet_address() {
        let bad = Ngo::new("Bad".to_string(), "not-a-pubkey".to_string());
        let pledges = vec![Pledge::new(Uuid::new_v4(), bad.id, 1_000, 202610)];
        let active: HashMap<Uuid, Ngo> = [(bad.id, bad)].into();

        let allocations = build_allocations(&pledges, &active).unwrap();
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_empty_week_yields_no_allocations() {
        let allocations = build_allocations(&[], &HashMap::new()).unwrap();
        assert!(allocations.is_empty());
    }
}
