// ============================================
// Ranking Aggregation Stages
// ============================================
//
// Daily:   live top-N for D -> product_rankings_daily
// Weekly:  daily rows in weekly_window(D)  -> product_rankings_weekly
// Monthly: daily rows in monthly_window(D) -> product_rankings_monthly
//
// Every write is an upsert, so a stage can be re-run for the same date.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{RankingError, Result};
use crate::ledger::RankingLedger;
use crate::metrics;
use crate::models::period::{monthly_window, weekly_window};
use crate::models::{
    DailyRanking, MonthlyRanking, ProductId, UpsertOutcome, WeeklyRanking, YearMonth, YearWeek,
};
use crate::services::reader::RankingReader;

/// Default number of live entries copied into the daily table
pub const DEFAULT_DAILY_TOP_N: u64 = 100;

/// Result of one stage (or one gated branch) of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed { inserted: u64, updated: u64 },
    /// Ran, but had no input rows
    Empty,
    /// Calendar gate was closed
    Skipped,
}

impl StageOutcome {
    pub fn rows_written(&self) -> u64 {
        match self {
            StageOutcome::Completed { inserted, updated } => inserted + updated,
            StageOutcome::Empty | StageOutcome::Skipped => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Completed { .. } => "completed",
            StageOutcome::Empty => "empty",
            StageOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Default)]
struct WriteTally {
    inserted: u64,
    updated: u64,
}

impl WriteTally {
    fn add(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    fn finish(self, period: &str) -> StageOutcome {
        metrics::record_rows_written(period, "inserted", self.inserted);
        metrics::record_rows_written(period, "updated", self.updated);

        if self.inserted + self.updated == 0 {
            StageOutcome::Empty
        } else {
            StageOutcome::Completed {
                inserted: self.inserted,
                updated: self.updated,
            }
        }
    }
}

fn to_rank(index: usize) -> Result<i32> {
    i32::try_from(index + 1)
        .map_err(|_| RankingError::Validation(format!("rank {} does not fit the ledger", index + 1)))
}

/// Sum scores per product and order by total descending, ties by product id
/// ascending. Position in the result is the rank minus one.
pub fn rollup(rows: &[DailyRanking]) -> Vec<(ProductId, f64)> {
    let mut totals: HashMap<ProductId, f64> = HashMap::new();
    for row in rows {
        *totals.entry(row.product_id).or_insert(0.0) += row.score;
    }

    let mut ranked: Vec<(ProductId, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// Copies the live top-N of a day into the daily ledger
pub struct DailyAggregation {
    reader: Arc<RankingReader>,
    ledger: Arc<dyn RankingLedger>,
    top_n: u64,
}

impl DailyAggregation {
    pub fn new(reader: Arc<RankingReader>, ledger: Arc<dyn RankingLedger>, top_n: u64) -> Self {
        Self {
            reader,
            ledger,
            top_n,
        }
    }

    pub async fn run(&self, date: NaiveDate) -> Result<StageOutcome> {
        let started = Instant::now();
        let key = self.reader.day_key(date);

        let entries = self.reader.top_scores(date, self.top_n).await?;
        info!(key = %key, entries = entries.len(), top_n = self.top_n, "Loaded live ranking");

        // Validate every row before the first write
        let rows = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (product_id, score))| {
                DailyRanking::new(date, product_id, to_rank(idx)?, score)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut tally = WriteTally::default();
        for row in &rows {
            tally.add(self.ledger.upsert_daily(row).await?);
        }

        debug!(
            date = %date,
            inserted = tally.inserted,
            updated = tally.updated,
            "Daily rows upserted"
        );
        metrics::record_stage_duration("daily", started.elapsed());

        Ok(tally.finish("daily"))
    }
}

/// Builds weekly and monthly rollups from the daily ledger
pub struct RollupAggregation {
    ledger: Arc<dyn RankingLedger>,
}

impl RollupAggregation {
    pub fn new(ledger: Arc<dyn RankingLedger>) -> Self {
        Self { ledger }
    }

    /// Rolls up the week before `date`, keyed by that week. Consumers keying
    /// weekly rows by the run date's own ISO week read one week later.
    pub async fn run_weekly(&self, date: NaiveDate) -> Result<StageOutcome> {
        let started = Instant::now();
        let window = weekly_window(date);
        let year_week = YearWeek::from_date(window.start);

        let rows = self.ledger.find_daily_between(window).await?;
        info!(
            year_week = %year_week,
            start = %window.start,
            end = %window.end,
            daily_rows = rows.len(),
            "Aggregating weekly ranking"
        );

        let ranked = rollup(&rows);
        let mut tally = WriteTally::default();
        for (idx, (product_id, _)) in ranked.iter().enumerate() {
            let row = WeeklyRanking::new(year_week, *product_id, to_rank(idx)?)?;
            tally.add(self.ledger.upsert_weekly(&row).await?);
        }

        metrics::record_stage_duration("weekly", started.elapsed());
        Ok(tally.finish("weekly"))
    }

    /// Rolls up the month before `date`, keyed by that month. Consumers keying
    /// monthly rows by the run date's own month read one month later.
    pub async fn run_monthly(&self, date: NaiveDate) -> Result<StageOutcome> {
        let started = Instant::now();
        let window = monthly_window(date);
        let year_month = YearMonth::from_date(window.start);

        let rows = self.ledger.find_daily_between(window).await?;
        info!(
            year_month = %year_month,
            start = %window.start,
            end = %window.end,
            daily_rows = rows.len(),
            "Aggregating monthly ranking"
        );

        let ranked = rollup(&rows);
        let mut tally = WriteTally::default();
        for (idx, (product_id, _)) in ranked.iter().enumerate() {
            let row = MonthlyRanking::new(year_month, *product_id, to_rank(idx)?)?;
            tally.add(self.ledger.upsert_monthly(&row).await?);
        }

        metrics::record_stage_duration("monthly", started.elapsed());
        Ok(tally.finish("monthly"))
    }
}
