// Protocol constants shared between the off-chain aggregator and the
// escrow ledger. The conversion rate is a protocol constant: changing it
// requires a coordinated redeployment of both sides.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;

/// Canonical conversion rate: 1000 points = 0.05 SOL.
pub const LAMPORTS_PER_1000_POINTS: u64 = 50_000_000;

/// 100 points = $1 (display estimate only, never settled).
pub const POINTS_PER_DOLLAR: u64 = 100;

/// Minimum points for a single pledge (500 points = $5).
pub const MIN_PLEDGE_POINTS: i64 = 500;

/// Registry capacity limits, shared with the on-chain program.
pub const MAX_NGOS: usize = 50;
pub const MAX_SPONSORS: usize = 50;

/// Maximum NGOs per batch (transaction size limit on the settlement layer).
pub const MAX_BATCH_SIZE: usize = 10;

/// Maximum length of a registry entry name.
pub const MAX_NAME_LEN: usize = 64;

/// Convert points to lamports. Returns `None` on overflow.
pub fn points_to_lamports(points: u64) -> Option<u64> {
    points
        .checked_mul(LAMPORTS_PER_1000_POINTS)
        .map(|v| v / 1000)
}

/// Display-only fiat estimate for a number of points.
pub fn points_to_usd(points: i64) -> Decimal {
    Decimal::from(points) / Decimal::from(POINTS_PER_DOLLAR)
}

/// Current settlement period in YYYYWW form (ISO week), e.g. 202635.
pub fn current_week_number() -> i64 {
    let week = Utc::now().iso_week();
    week.year() as i64 * 100 + week.week() as i64
}

/// Wall-clock-derived unique period for repeated manual test runs.
/// Only reachable when the dev escape hatch is enabled outside production;
/// it deliberately defeats the idempotency guard.
pub fn unique_dev_period() -> i64 {
    Utc::now().timestamp_millis()
}

/// Audit trail link for a settlement transaction.
pub fn explorer_url(base: &str, signature: &str, cluster: &str) -> String {
    format!("{}/tx/{}?cluster={}", base, signature, cluster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_points_to_lamports_exact() {
        // 500 points at 1000 points = 0.05 SOL is exactly 25_000_000 lamports.
        assert_eq!(points_to_lamports(500), Some(25_000_000));
        assert_eq!(points_to_lamports(1000), Some(50_000_000));
        assert_eq!(points_to_lamports(0), Some(0));
    }

    #[test]
    fn test_points_to_lamports_no_drift() {
        // The rate divides 1000 evenly, so repeated conversions never drift.
        for points in [1u64, 7, 499, 501, 12_345] {
            let once = points_to_lamports(points).unwrap();
            assert_eq!(once, points * 50_000);
        }
    }

    #[test]
    fn test_points_to_lamports_overflow() {
        assert_eq!(points_to_lamports(u64::MAX), None);
    }

    #[test]
    fn test_points_to_usd() {
        assert_eq!(points_to_usd(500), dec!(5));
        assert_eq!(points_to_usd(150), dec!(1.5));
    }

    #[test]
    fn test_current_week_number_shape() {
        let week = current_week_number();
        // YYYYWW: six digits, week part 01..=53.
        assert!(week > 200000 && week < 300000);
        assert!((1..=53).contains(&(week % 100)));
    }

    #[test]
    fn test_explorer_url() {
        assert_eq!(
            explorer_url("https://explorer.solana.com", "abc123", "devnet"),
            "https://explorer.solana.com/tx/abc123?cluster=devnet"
        );
    }
}
