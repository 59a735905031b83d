//! Ranking pipeline
//!
//! `Start -> Daily -> Fork(weekly | monthly) -> Join -> Done` for one
//! reference date. The weekly branch only runs on Mondays and the monthly
//! branch only on the 1st; both read the daily table written by the Daily
//! stage, so they run concurrently after it.

use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{RankingError, Result};
use crate::ledger::RankingLedger;
use crate::metrics;
use crate::models::period::{is_month_start, is_week_start};
use crate::services::{DailyAggregation, RankingReader, RollupAggregation, StageOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Daily,
    Fork,
    Join,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::Daily => "daily",
            PipelineState::Fork => "fork",
            PipelineState::Join => "join",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Gated rollup branches started at the fork
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Weekly,
    Monthly,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Weekly => "weekly",
            Branch::Monthly => "monthly",
        }
    }

    pub fn is_open(&self, date: NaiveDate) -> bool {
        match self {
            Branch::Weekly => is_week_start(date),
            Branch::Monthly => is_month_start(date),
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub daily: StageOutcome,
    pub weekly: StageOutcome,
    pub monthly: StageOutcome,
    pub state: PipelineState,
    pub elapsed: Duration,
}

pub struct PipelineOrchestrator {
    daily: DailyAggregation,
    rollups: Arc<RollupAggregation>,
}

impl PipelineOrchestrator {
    pub fn new(reader: Arc<RankingReader>, ledger: Arc<dyn RankingLedger>, daily_top_n: u64) -> Self {
        Self {
            daily: DailyAggregation::new(reader, ledger.clone(), daily_top_n),
            rollups: Arc::new(RollupAggregation::new(ledger)),
        }
    }

    /// Run every stage for `date`.
    ///
    /// A failed Daily stage stops the run before the fork. When a branch
    /// fails the other still runs to completion and the first error is
    /// returned after the join.
    pub async fn run(&self, date: NaiveDate) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let mut state = PipelineState::Start;

        info!(run_id = %run_id, date = %date, "Starting ranking pipeline");

        let result = self.run_stages(run_id, date, &mut state).await;
        let elapsed = started.elapsed();
        metrics::record_stage_duration("pipeline", elapsed);

        match result {
            Ok((daily, weekly, monthly)) => {
                metrics::record_job_run("success");
                info!(
                    run_id = %run_id,
                    date = %date,
                    daily = daily.as_str(),
                    weekly = weekly.as_str(),
                    monthly = monthly.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Ranking pipeline completed"
                );
                Ok(PipelineReport {
                    run_id,
                    date,
                    daily,
                    weekly,
                    monthly,
                    state,
                    elapsed,
                })
            }
            Err(e) => {
                metrics::record_job_run("error");
                error!(
                    run_id = %run_id,
                    date = %date,
                    state = %state,
                    error = %e,
                    "Ranking pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        date: NaiveDate,
        state: &mut PipelineState,
    ) -> Result<(StageOutcome, StageOutcome, StageOutcome)> {
        transition(run_id, state, PipelineState::Daily);
        let daily = self.daily.run(date).await?;

        transition(run_id, state, PipelineState::Fork);
        let weekly = tokio::spawn(run_branch(run_id, Branch::Weekly, date, self.rollups.clone()));
        let monthly = tokio::spawn(run_branch(run_id, Branch::Monthly, date, self.rollups.clone()));

        let weekly = join_branch(Branch::Weekly, weekly.await);
        let monthly = join_branch(Branch::Monthly, monthly.await);
        transition(run_id, state, PipelineState::Join);

        let (weekly, monthly) = (weekly?, monthly?);
        transition(run_id, state, PipelineState::Done);

        Ok((daily, weekly, monthly))
    }
}

fn transition(run_id: Uuid, state: &mut PipelineState, next: PipelineState) {
    info!(run_id = %run_id, from = %state, to = %next, "Pipeline state transition");
    *state = next;
}

async fn run_branch(
    run_id: Uuid,
    branch: Branch,
    date: NaiveDate,
    rollups: Arc<RollupAggregation>,
) -> Result<StageOutcome> {
    if !branch.is_open(date) {
        info!(run_id = %run_id, branch = branch.as_str(), date = %date, "Gate closed, skipping rollup");
        metrics::record_gate_skip(branch.as_str());
        return Ok(StageOutcome::Skipped);
    }

    let outcome = match branch {
        Branch::Weekly => rollups.run_weekly(date).await,
        Branch::Monthly => rollups.run_monthly(date).await,
    };

    match &outcome {
        Ok(result) => info!(
            run_id = %run_id,
            branch = branch.as_str(),
            outcome = result.as_str(),
            rows = result.rows_written(),
            "Rollup branch finished"
        ),
        Err(e) => error!(
            run_id = %run_id,
            branch = branch.as_str(),
            error = %e,
            "Rollup branch failed"
        ),
    }

    outcome
}

fn join_branch(
    branch: Branch,
    joined: std::result::Result<Result<StageOutcome>, tokio::task::JoinError>,
) -> Result<StageOutcome> {
    joined.map_err(|e| {
        RankingError::Internal(format!("{} rollup task did not complete: {}", branch.as_str(), e))
    })?
}
