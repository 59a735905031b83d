use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use super::RankingLedger;
use crate::error::{RankingError, Result};
use crate::models::{
    DailyRanking, DateWindow, MonthlyRanking, UpsertOutcome, WeeklyRanking, YearMonth, YearWeek,
};

/// PostgreSQL ranking ledger
#[derive(Clone)]
pub struct PgRankingLedger {
    pool: PgPool,
}

impl PgRankingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the ranking tables migration
    pub async fn migrate(&self) -> Result<()> {
        debug!("Running product ranking migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Product ranking migrations completed");
        Ok(())
    }
}

/// `xmax = 0` only holds for a freshly inserted tuple, so it tells an
/// ON CONFLICT insert apart from the update branch.
fn upsert_outcome(row: &PgRow) -> Result<UpsertOutcome> {
    let inserted: bool = row.try_get("inserted")?;
    Ok(if inserted {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    })
}

fn to_sql_bound(value: u64, name: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RankingError::InvalidArgument(format!("{} {} is too large", name, value)))
}

fn daily_from_row(row: &PgRow) -> Result<DailyRanking> {
    Ok(DailyRanking {
        date: row.try_get("ranking_date")?,
        product_id: row.try_get("product_id")?,
        rank: row.try_get("rank")?,
        score: row.try_get("score")?,
    })
}

#[async_trait]
impl RankingLedger for PgRankingLedger {
    async fn upsert_daily(&self, row: &DailyRanking) -> Result<UpsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_rankings_daily (ranking_date, product_id, rank, score)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ranking_date, product_id)
            DO UPDATE SET rank = EXCLUDED.rank, score = EXCLUDED.score, updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(row.date)
        .bind(row.product_id)
        .bind(row.rank)
        .bind(row.score)
        .fetch_one(&self.pool)
        .await?;

        upsert_outcome(&result)
    }

    async fn upsert_weekly(&self, row: &WeeklyRanking) -> Result<UpsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_rankings_weekly (year_week, product_id, rank)
            VALUES ($1, $2, $3)
            ON CONFLICT (year_week, product_id)
            DO UPDATE SET rank = EXCLUDED.rank, updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(row.year_week.to_string())
        .bind(row.product_id)
        .bind(row.rank)
        .fetch_one(&self.pool)
        .await?;

        upsert_outcome(&result)
    }

    async fn upsert_monthly(&self, row: &MonthlyRanking) -> Result<UpsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_rankings_monthly (year_month, product_id, rank)
            VALUES ($1, $2, $3)
            ON CONFLICT (year_month, product_id)
            DO UPDATE SET rank = EXCLUDED.rank, updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(row.year_month.to_string())
        .bind(row.product_id)
        .bind(row.rank)
        .fetch_one(&self.pool)
        .await?;

        upsert_outcome(&result)
    }

    async fn find_daily(&self, date: NaiveDate) -> Result<Vec<DailyRanking>> {
        let rows = sqlx::query(
            r#"
            SELECT ranking_date, product_id, rank, score
            FROM product_rankings_daily
            WHERE ranking_date = $1
            ORDER BY rank ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(daily_from_row).collect()
    }

    async fn find_daily_between(&self, window: DateWindow) -> Result<Vec<DailyRanking>> {
        let rows = sqlx::query(
            r#"
            SELECT ranking_date, product_id, rank, score
            FROM product_rankings_daily
            WHERE ranking_date BETWEEN $1 AND $2
            ORDER BY ranking_date ASC, rank ASC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            start = %window.start,
            end = %window.end,
            rows = rows.len(),
            "Loaded daily rankings for window"
        );

        rows.iter().map(daily_from_row).collect()
    }

    async fn search_weekly(
        &self,
        year_week: YearWeek,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<WeeklyRanking>, u64)> {
        let key = year_week.to_string();

        let rows = sqlx::query(
            r#"
            SELECT product_id, rank
            FROM product_rankings_weekly
            WHERE year_week = $1
            ORDER BY rank ASC, product_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&key)
        .bind(to_sql_bound(limit, "limit")?)
        .bind(to_sql_bound(offset, "offset")?)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_rankings_weekly WHERE year_week = $1")
                .bind(&key)
                .fetch_one(&self.pool)
                .await?;

        let items = rows
            .iter()
            .map(|row| {
                Ok(WeeklyRanking {
                    year_week,
                    product_id: row.try_get("product_id")?,
                    rank: row.try_get("rank")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((items, total.max(0) as u64))
    }

    async fn search_monthly(
        &self,
        year_month: YearMonth,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<MonthlyRanking>, u64)> {
        let key = year_month.to_string();

        let rows = sqlx::query(
            r#"
            SELECT product_id, rank
            FROM product_rankings_monthly
            WHERE year_month = $1
            ORDER BY rank ASC, product_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&key)
        .bind(to_sql_bound(limit, "limit")?)
        .bind(to_sql_bound(offset, "offset")?)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_rankings_monthly WHERE year_month = $1")
                .bind(&key)
                .fetch_one(&self.pool)
                .await?;

        let items = rows
            .iter()
            .map(|row| {
                Ok(MonthlyRanking {
                    year_month,
                    product_id: row.try_get("product_id")?,
                    rank: row.try_get("rank")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((items, total.max(0) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql_bound() {
        assert_eq!(to_sql_bound(20, "limit").unwrap(), 20);
        assert!(matches!(
            to_sql_bound(u64::MAX, "offset"),
            Err(RankingError::InvalidArgument(_))
        ));
    }
}
