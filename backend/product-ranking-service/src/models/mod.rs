pub mod period;

pub use period::{DateWindow, YearMonth, YearWeek};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RankingError, Result};

/// Product identifier (BIGINT in the ledger)
pub type ProductId = i64;

/// One product's standing for one calendar day.
///
/// Unique per (date, product_id). Re-running the day overwrites the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRanking {
    pub date: NaiveDate,
    pub product_id: ProductId,
    pub rank: i32,
    pub score: f64,
}

impl DailyRanking {
    pub fn new(date: NaiveDate, product_id: ProductId, rank: i32, score: f64) -> Result<Self> {
        validate_product_id(product_id)?;
        validate_rank(rank)?;
        if !score.is_finite() || score <= 0.0 {
            return Err(RankingError::Validation(format!(
                "score must be finite and > 0, got {} (product {} on {})",
                score, product_id, date
            )));
        }

        Ok(Self {
            date,
            product_id,
            rank,
            score,
        })
    }
}

/// Weekly rollup row, unique per (year_week, product_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyRanking {
    pub year_week: YearWeek,
    pub product_id: ProductId,
    pub rank: i32,
}

impl WeeklyRanking {
    pub fn new(year_week: YearWeek, product_id: ProductId, rank: i32) -> Result<Self> {
        validate_product_id(product_id)?;
        validate_rank(rank)?;
        Ok(Self {
            year_week,
            product_id,
            rank,
        })
    }
}

/// Monthly rollup row, unique per (year_month, product_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRanking {
    pub year_month: YearMonth,
    pub product_id: ProductId,
    pub rank: i32,
}

impl MonthlyRanking {
    pub fn new(year_month: YearMonth, product_id: ProductId, rank: i32) -> Result<Self> {
        validate_product_id(product_id)?;
        validate_rank(rank)?;
        Ok(Self {
            year_month,
            product_id,
            rank,
        })
    }
}

fn validate_rank(rank: i32) -> Result<()> {
    if rank <= 0 {
        return Err(RankingError::Validation(format!(
            "rank must be > 0, got {}",
            rank
        )));
    }
    Ok(())
}

fn validate_product_id(product_id: ProductId) -> Result<()> {
    if product_id < 0 {
        return Err(RankingError::Validation(format!(
            "product id must be non-negative, got {}",
            product_id
        )));
    }
    Ok(())
}

/// Whether an upsert created the row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A product and its 1-based rank within a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedProduct {
    pub product_id: ProductId,
    pub rank: i64,
}

/// One page of a ranking listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPage {
    pub items: Vec<RankedProduct>,
    pub total_elements: u64,
    /// 1-based page number that was requested
    pub page: u32,
    pub size: u32,
}

impl RankPage {
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_elements: 0,
            page,
            size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.size))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Validated 1-based page request shared by every listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Result<Self> {
        if page <= 0 {
            return Err(RankingError::InvalidArgument(format!(
                "page must be >= 1, got {}",
                page
            )));
        }
        if size <= 0 {
            return Err(RankingError::InvalidArgument(format!(
                "size must be >= 1, got {}",
                size
            )));
        }

        let page = u32::try_from(page)
            .map_err(|_| RankingError::InvalidArgument(format!("page {} is too large", page)))?;
        let size = u32::try_from(size)
            .map_err(|_| RankingError::InvalidArgument(format!("size {} is too large", size)))?;

        let request = Self { page, size };
        // Store ranges and SQL offsets are signed 64-bit
        if request.last_index() > i64::MAX as u64 {
            return Err(RankingError::InvalidArgument(format!(
                "page {} of size {} is out of range",
                page, size
            )));
        }

        Ok(request)
    }

    /// Zero-based index of the first row on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    /// Inclusive index of the last row on this page
    pub fn last_index(&self) -> u64 {
        self.offset() + u64::from(self.size) - 1
    }
}
