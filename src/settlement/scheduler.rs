// Weekly settlement trigger.
//
// Runs once per week at a configured weekday and UTC hour (default Sunday
// 02:00, off-peak). Each firing drives one full orchestrator cycle for the
// current week; a missed or failed run is recovered by the next firing or
// by the manual admin trigger, both of which hit the same idempotent path.

use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info};

use crate::settlement::orchestrator::SettlementOrchestrator;

pub struct SettlementScheduler {
    /// 0 = Monday .. 6 = Sunday.
    weekday: u8,
    /// UTC hour (0-23).
    hour: u32,
    orchestrator: Arc<SettlementOrchestrator>,
}

impl SettlementScheduler {
    pub fn new(weekday: u8, hour: u32, orchestrator: Arc<SettlementOrchestrator>) -> Self {
        Self {
            weekday,
            hour,
            orchestrator,
        }
    }

    /// Start the scheduler loop in the background.
    pub fn start(&self) -> JoinHandle<()> {
        let weekday = self.weekday;
        let hour = self.hour;
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next_execution = Self::calculate_next_execution(now, weekday, hour);
                let wait = next_execution.signed_duration_since(now);

                if wait.num_seconds() > 0 {
                    info!(
                        "⏰ Next settlement scheduled for {} UTC",
                        next_execution.format("%Y-%m-%d %H:%M:%S")
                    );
                    tokio::time::sleep(Duration::from_secs(wait.num_seconds() as u64)).await;
                }

                info!("🔄 Starting weekly settlement cycle");
                match orchestrator.run_cycle(None, false).await {
                    Ok(outcome) => info!("✓ Settlement cycle finished: {:?}", outcome),
                    Err(e) => error!("❌ Settlement cycle failed: {:?}", e),
                }
            }
        })
    }

    /// Next occurrence of `weekday` at `hour:00:00` strictly after `now`.
    /// Out-of-range inputs are clamped; the loop must never panic on a
    /// misconfigured trigger.
    fn calculate_next_execution(now: DateTime<Utc>, weekday: u8, hour: u32) -> DateTime<Utc> {
        let weekday = weekday.min(6);
        let hour = hour.min(23);
        let today = now.date_naive();
        let days_ahead = (weekday as i64 - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let candidate = (today + chrono::Duration::days(days_ahead))
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let candidate = Utc.from_utc_datetime(&candidate);

        if candidate <= now {
            candidate + chrono::Duration::days(7)
        } else {
            candidate
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn test_calculate_next_execution() {
        // Wednesday 2024-01-03 10:00:00 UTC.
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();

        // Sunday 02:00 is four days out.
        let next = SettlementScheduler::calculate_next_execution(now, 6, 2);
        assert_eq!(next.weekday().num_days_from_monday(), 6);
        assert_eq!(next.hour(), 2);
        assert_eq!(next.day(), 7);

        // Same day, later hour: fires today.
        let next = SettlementScheduler::calculate_next_execution(now, 2, 14);
        assert_eq!(next.day(), 3);
        assert_eq!(next.hour(), 14);

        // Same day, hour already passed: fires next week.
        let next = SettlementScheduler::calculate_next_execution(now, 2, 9);
        assert_eq!(next.day(), 10);
    }

    #[test]
    fn test_out_of_range_trigger_is_clamped() {
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();

        // weekday 9 / hour 99 clamp to Sunday 23:00 instead of panicking.
        let next = SettlementScheduler::calculate_next_execution(now, 9, 99);
        assert_eq!(next.weekday().num_days_from_monday(), 6);
        assert_eq!(next.hour(), 23);
    }

    #[test]
    fn test_execution_is_strictly_in_future() {
        // Exactly at the trigger instant the next firing is a week away.
        let now = Utc.with_ymd_and_hms(2024, 1, 7, 2, 0, 0).unwrap();
        let next = SettlementScheduler::calculate_next_execution(now, 6, 2);
        assert_eq!(next, now + chrono::Duration::days(7));
    }
}
