use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::RankingLedger;
use crate::error::Result;
use crate::models::{
    DailyRanking, DateWindow, MonthlyRanking, ProductId, UpsertOutcome, WeeklyRanking, YearMonth,
    YearWeek,
};

#[derive(Debug, Default)]
struct Tables {
    daily: BTreeMap<(NaiveDate, ProductId), DailyRanking>,
    weekly: BTreeMap<(YearWeek, ProductId), WeeklyRanking>,
    monthly: BTreeMap<(YearMonth, ProductId), MonthlyRanking>,
}

/// Ledger held in process memory, keyed exactly like the unique constraints
/// of the SQL tables.
#[derive(Debug, Default)]
pub struct InMemoryRankingLedger {
    tables: Mutex<Tables>,
}

fn upsert<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V) -> UpsertOutcome {
    match table.insert(key, value) {
        Some(_) => UpsertOutcome::Updated,
        None => UpsertOutcome::Inserted,
    }
}

fn page<T: Clone>(mut rows: Vec<T>, offset: u64, limit: u64) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let items = rows
        .drain(..)
        .skip(offset.min(total) as usize)
        .take(limit.min(total) as usize)
        .collect();
    (items, total)
}

impl InMemoryRankingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn daily_rows(&self) -> Vec<DailyRanking> {
        self.lock().daily.values().cloned().collect()
    }

    pub fn weekly_rows(&self) -> Vec<WeeklyRanking> {
        self.lock().weekly.values().cloned().collect()
    }

    pub fn monthly_rows(&self) -> Vec<MonthlyRanking> {
        self.lock().monthly.values().cloned().collect()
    }
}

#[async_trait]
impl RankingLedger for InMemoryRankingLedger {
    async fn upsert_daily(&self, row: &DailyRanking) -> Result<UpsertOutcome> {
        let key = (row.date, row.product_id);
        Ok(upsert(&mut self.lock().daily, key, row.clone()))
    }

    async fn upsert_weekly(&self, row: &WeeklyRanking) -> Result<UpsertOutcome> {
        let key = (row.year_week, row.product_id);
        Ok(upsert(&mut self.lock().weekly, key, row.clone()))
    }

    async fn upsert_monthly(&self, row: &MonthlyRanking) -> Result<UpsertOutcome> {
        let key = (row.year_month, row.product_id);
        Ok(upsert(&mut self.lock().monthly, key, row.clone()))
    }

    async fn find_daily(&self, date: NaiveDate) -> Result<Vec<DailyRanking>> {
        let mut rows: Vec<DailyRanking> = self
            .lock()
            .daily
            .values()
            .filter(|row| row.date == date)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        Ok(rows)
    }

    async fn find_daily_between(&self, window: DateWindow) -> Result<Vec<DailyRanking>> {
        let mut rows: Vec<DailyRanking> = self
            .lock()
            .daily
            .values()
            .filter(|row| window.contains(row.date))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.date, row.rank));
        Ok(rows)
    }

    async fn search_weekly(
        &self,
        year_week: YearWeek,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<WeeklyRanking>, u64)> {
        let mut rows: Vec<WeeklyRanking> = self
            .lock()
            .weekly
            .values()
            .filter(|row| row.year_week == year_week)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.rank, row.product_id));
        Ok(page(rows, offset, limit))
    }

    async fn search_monthly(
        &self,
        year_month: YearMonth,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<MonthlyRanking>, u64)> {
        let mut rows: Vec<MonthlyRanking> = self
            .lock()
            .monthly
            .values()
            .filter(|row| row.year_month == year_month)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.rank, row.product_id));
        Ok(page(rows, offset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_daily_is_idempotent() {
        let ledger = InMemoryRankingLedger::new();
        let row = DailyRanking::new(date(1), 7, 1, 10.0).unwrap();

        assert_eq!(ledger.upsert_daily(&row).await.unwrap(), UpsertOutcome::Inserted);
        let rerun = DailyRanking::new(date(1), 7, 2, 12.0).unwrap();
        assert_eq!(ledger.upsert_daily(&rerun).await.unwrap(), UpsertOutcome::Updated);

        let rows = ledger.daily_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 2);
        assert_eq!(rows[0].score, 12.0);
    }

    #[tokio::test]
    async fn test_find_daily_between_is_inclusive() {
        let ledger = InMemoryRankingLedger::new();
        for d in 1..=5 {
            let row = DailyRanking::new(date(d), 1, 1, 1.0).unwrap();
            ledger.upsert_daily(&row).await.unwrap();
        }

        let window = DateWindow {
            start: date(2),
            end: date(4),
        };
        let rows = ledger.find_daily_between(window).await.unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2), date(3), date(4)]);
    }

    #[tokio::test]
    async fn test_search_weekly_pages_by_rank() {
        let ledger = InMemoryRankingLedger::new();
        let week = YearWeek::from_date(date(3));
        let other = YearWeek::from_date(date(10));

        for (product_id, rank) in [(30, 3), (10, 1), (20, 2)] {
            let row = WeeklyRanking::new(week, product_id, rank).unwrap();
            ledger.upsert_weekly(&row).await.unwrap();
        }
        ledger
            .upsert_weekly(&WeeklyRanking::new(other, 99, 1).unwrap())
            .await
            .unwrap();

        let (items, total) = ledger.search_weekly(week, 1, 5).await.unwrap();
        assert_eq!(total, 3);
        let ids: Vec<ProductId> = items.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![20, 30]);

        let (beyond, total) = ledger.search_weekly(week, 10, 5).await.unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_search_monthly_empty_period() {
        let ledger = InMemoryRankingLedger::new();
        let month = YearMonth::from_date(date(1));
        let (items, total) = ledger.search_monthly(month, 0, 10).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }
}
