//! Durable ranking ledger
//!
//! Stores daily standings and the weekly/monthly rollups derived from them.
//! Every write is an upsert keyed by (period, product_id), so re-running a
//! period overwrites rows instead of duplicating them.

mod memory;
mod postgres;

pub use memory::InMemoryRankingLedger;
pub use postgres::PgRankingLedger;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    DailyRanking, DateWindow, MonthlyRanking, UpsertOutcome, WeeklyRanking, YearMonth, YearWeek,
};

#[async_trait]
pub trait RankingLedger: Send + Sync {
    async fn upsert_daily(&self, row: &DailyRanking) -> Result<UpsertOutcome>;

    async fn upsert_weekly(&self, row: &WeeklyRanking) -> Result<UpsertOutcome>;

    async fn upsert_monthly(&self, row: &MonthlyRanking) -> Result<UpsertOutcome>;

    /// Daily rows for one date, rank ascending
    async fn find_daily(&self, date: NaiveDate) -> Result<Vec<DailyRanking>>;

    /// Daily rows whose date falls in the closed window
    async fn find_daily_between(&self, window: DateWindow) -> Result<Vec<DailyRanking>>;

    /// One page of a week's rollup (rank ascending) plus the week's row count
    async fn search_weekly(
        &self,
        year_week: YearWeek,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<WeeklyRanking>, u64)>;

    /// One page of a month's rollup (rank ascending) plus the month's row count
    async fn search_monthly(
        &self,
        year_month: YearMonth,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<MonthlyRanking>, u64)>;
}
