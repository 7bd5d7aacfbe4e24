//! Scheduling: next-run computation for flows with cron schedules.

mod cron;

pub use self::cron::next_run;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::flow::ScheduleSettings;
use crate::store::FlowStore;

/// Computes future run times for scheduled flows.
///
/// Runs independently of execution: a sweep loads every flow from the
/// store, recomputes `next_run_at` for the enabled schedules, and writes
/// the updated flows back.
pub struct Scheduler {
    sweep_interval: std::time::Duration,
}

impl Scheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sweep_interval: std::time::Duration::from_secs(config.schedule_sweep_interval),
        }
    }

    /// How long a sweep loop should sleep between passes.
    pub fn sweep_interval(&self) -> std::time::Duration {
        self.sweep_interval
    }

    /// Next run for one schedule, or `None` when scheduling is off.
    pub fn next_run_for(
        &self,
        settings: &ScheduleSettings,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !settings.enabled {
            return None;
        }
        let expression = settings.cron_expression.as_deref()?;
        Some(next_run(expression, now))
    }

    /// Recompute `next_run_at` for every enabled flow schedule.
    ///
    /// Returns the number of flows updated.
    pub async fn recompute_all(&self, store: &dyn FlowStore) -> EngineResult<usize> {
        let now = Utc::now();
        let mut updated = 0;
        for mut flow in store.list_flows().await? {
            let Some(next) = self.next_run_for(&flow.config.schedule, now) else {
                continue;
            };
            debug!(flow = %flow.name, next_run = %next, "Computed next scheduled run");
            flow.config.schedule = flow.config.schedule.with_next_run(next);
            store.save_flow(&flow).await?;
            updated += 1;
        }
        info!(updated, "Schedule sweep finished");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{FlowConfiguration, FlowType, IntegrationFlow};
    use crate::store::MemoryStore;

    fn scheduler() -> Scheduler {
        Scheduler::new(&EngineConfig::default())
    }

    #[test]
    fn test_disabled_schedule_has_no_next_run() {
        let settings = ScheduleSettings::default();
        assert!(scheduler().next_run_for(&settings, Utc::now()).is_none());
    }

    #[test]
    fn test_enabled_schedule_without_expression_has_no_next_run() {
        let settings = ScheduleSettings {
            enabled: true,
            ..Default::default()
        };
        assert!(scheduler().next_run_for(&settings, Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_recompute_all_updates_scheduled_flows() {
        let store = MemoryStore::new();
        let scheduled = IntegrationFlow::new(
            "nightly",
            FlowConfiguration::new(serde_json::json!({}), FlowType::Inbound)
                .with_schedule(ScheduleSettings::cron("0 */5 * * * ?")),
        );
        let unscheduled = IntegrationFlow::new(
            "manual-only",
            FlowConfiguration::new(serde_json::json!({}), FlowType::Outbound),
        );
        store.save_flow(&scheduled).await.unwrap();
        store.save_flow(&unscheduled).await.unwrap();

        let updated = scheduler().recompute_all(&store).await.unwrap();
        assert_eq!(updated, 1);

        let reloaded = store.get_flow(scheduled.id).await.unwrap().unwrap();
        assert!(reloaded.config.schedule.next_run_at.is_some());
        let untouched = store.get_flow(unscheduled.id).await.unwrap().unwrap();
        assert!(untouched.config.schedule.next_run_at.is_none());
    }
}
