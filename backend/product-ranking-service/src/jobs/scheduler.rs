//! Daily trigger for the ranking pipeline
//!
//! Fires once a day at a fixed local time and runs the pipeline for the
//! local date before the firing instant.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::pipeline::PipelineOrchestrator;
use crate::config::ScheduleConfig;

/// Next instant strictly after `now` whose local time is `at`
pub fn next_run_after(now: DateTime<FixedOffset>, at: NaiveTime) -> DateTime<FixedOffset> {
    let offset = *now.offset();
    let today = now.date_naive().and_time(at);

    let candidate = if today > now.naive_local() {
        today
    } else {
        today + Days::new(1)
    };

    // A fixed offset has no gaps, so every local time maps to one instant
    DateTime::from_naive_utc_and_offset(candidate - offset, offset)
}

/// Date the pipeline should rank when fired at `fired_at`
pub fn reference_date(fired_at: DateTime<FixedOffset>) -> NaiveDate {
    fired_at.date_naive() - Days::new(1)
}

pub struct RankingScheduler {
    orchestrator: Arc<PipelineOrchestrator>,
    schedule: ScheduleConfig,
}

impl RankingScheduler {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, schedule: ScheduleConfig) -> Self {
        Self {
            orchestrator,
            schedule,
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.schedule.offset)
    }

    /// Loop until `shutdown` fires. A failed run is logged and the next day's
    /// run is still scheduled.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            at = %self.schedule.time,
            utc_offset = %self.schedule.offset,
            "Starting ranking scheduler"
        );

        loop {
            let now = self.now();
            let next = next_run_after(now, self.schedule.time);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

            info!(next_run = %next, wait_secs = wait.as_secs(), "Next ranking run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let date = reference_date(next);
                    match self.orchestrator.run(date).await {
                        Ok(report) => info!(
                            run_id = %report.run_id,
                            date = %date,
                            "Scheduled ranking run finished"
                        ),
                        Err(e) if e.is_transient() => warn!(
                            date = %date,
                            error = %e,
                            "Scheduled ranking run hit a transient failure, rerun with --mode run --date"
                        ),
                        Err(e) => error!(
                            date = %date,
                            error = %e,
                            "Scheduled ranking run failed"
                        ),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Ranking scheduler received shutdown signal");
                    break;
                }
            }
        }

        info!("Ranking scheduler stopped");
    }
}
