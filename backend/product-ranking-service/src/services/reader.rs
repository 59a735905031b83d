//! Ranking reads
//!
//! Live daily rankings come from the ordered-set store; weekly and monthly
//! rankings come from the ledger. Live reads degrade to "no data" when the
//! store fails, but a member that does not decode is always an error.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::MemberCodec;
use crate::error::{RankingError, Result};
use crate::keys::RankingKey;
use crate::ledger::RankingLedger;
use crate::metrics;
use crate::models::{PageRequest, ProductId, RankPage, RankedProduct, YearMonth, YearWeek};
use crate::store::OrderedSetStore;

pub struct RankingReader {
    store: Arc<dyn OrderedSetStore>,
    ledger: Arc<dyn RankingLedger>,
    keys: RankingKey,
    codec: MemberCodec,
}

impl RankingReader {
    pub fn new(
        store: Arc<dyn OrderedSetStore>,
        ledger: Arc<dyn RankingLedger>,
        keys: RankingKey,
        codec: MemberCodec,
    ) -> Self {
        Self {
            store,
            ledger,
            keys,
            codec,
        }
    }

    pub fn day_key(&self, date: NaiveDate) -> String {
        self.keys.day(date)
    }

    /// 1-based rank of a product on `date`, `None` when it is not ranked
    /// (or the store is unavailable).
    pub async fn find_rank(&self, date: NaiveDate, product_id: ProductId) -> Result<Option<i64>> {
        let key = self.day_key(date);
        let member = self.codec.encode(product_id)?;

        match self.store.rank(&key, &member).await {
            Ok(rank) => Ok(rank.map(|r| r as i64 + 1)),
            Err(e) => {
                warn!(key = %key, product_id, error = %e, "Rank lookup failed, reporting unranked");
                metrics::record_degraded_read("find_rank");
                Ok(None)
            }
        }
    }

    /// One page of the live ranking for `date`. `page` is 1-based.
    pub async fn search_ranks(&self, date: NaiveDate, page: i64, size: i64) -> Result<RankPage> {
        let request = PageRequest::new(page, size)?;
        let key = self.day_key(date);
        let start = request.offset();
        let end = request.last_index();

        let members = match self.store.reverse_range(&key, start, end).await {
            Ok(members) => members,
            Err(e) => return Ok(self.degraded(&key, "search_ranks", e, request)),
        };

        // Decode before touching cardinality: a bad member must surface as-is
        let mut seen = HashSet::with_capacity(members.len());
        let items = members
            .iter()
            .enumerate()
            .map(|(idx, member)| {
                Ok(RankedProduct {
                    product_id: self.decode_unique(&mut seen, member)?,
                    rank: (start + idx as u64 + 1) as i64,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let total_elements = match self.store.cardinality(&key).await {
            Ok(total) => total,
            Err(e) => return Ok(self.degraded(&key, "search_ranks", e, request)),
        };

        debug!(key = %key, start, end, count = items.len(), total_elements, "Ranking page loaded");

        Ok(RankPage {
            items,
            total_elements,
            page: request.page,
            size: request.size,
        })
    }

    /// Top `limit` products with their raw scores, highest first.
    ///
    /// Unlike the listing reads this does not degrade: the daily rollup must
    /// fail rather than record an empty day because the store was down.
    pub async fn top_scores(&self, date: NaiveDate, limit: u64) -> Result<Vec<(ProductId, f64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = self.day_key(date);
        let entries = self
            .store
            .reverse_range_with_scores(&key, 0, limit - 1)
            .await?;

        let mut seen = HashSet::with_capacity(entries.len());
        entries
            .into_iter()
            .map(|(member, score)| Ok((self.decode_unique(&mut seen, &member)?, score)))
            .collect()
    }

    /// One page of a week's rollup. `page` is 1-based.
    pub async fn search_weekly_ranks(
        &self,
        year_week: YearWeek,
        page: i64,
        size: i64,
    ) -> Result<RankPage> {
        let request = PageRequest::new(page, size)?;
        let (rows, total_elements) = self
            .ledger
            .search_weekly(year_week, request.offset(), u64::from(request.size))
            .await?;

        Ok(RankPage {
            items: rows
                .into_iter()
                .map(|row| RankedProduct {
                    product_id: row.product_id,
                    rank: i64::from(row.rank),
                })
                .collect(),
            total_elements,
            page: request.page,
            size: request.size,
        })
    }

    /// One page of a month's rollup. `page` is 1-based.
    pub async fn search_monthly_ranks(
        &self,
        year_month: YearMonth,
        page: i64,
        size: i64,
    ) -> Result<RankPage> {
        let request = PageRequest::new(page, size)?;
        let (rows, total_elements) = self
            .ledger
            .search_monthly(year_month, request.offset(), u64::from(request.size))
            .await?;

        Ok(RankPage {
            items: rows
                .into_iter()
                .map(|row| RankedProduct {
                    product_id: row.product_id,
                    rank: i64::from(row.rank),
                })
                .collect(),
            total_elements,
            page: request.page,
            size: request.size,
        })
    }

    /// Decode one member of a scan. Two members naming the same product
    /// (padded and unpadded forms side by side) are a writer mismatch.
    fn decode_unique(&self, seen: &mut HashSet<ProductId>, member: &str) -> Result<ProductId> {
        let product_id = self.codec.decode(member)?;
        if !seen.insert(product_id) {
            return Err(RankingError::malformed_member(
                member,
                format!("product {} is stored under more than one member", product_id),
            ));
        }
        Ok(product_id)
    }

    fn degraded(
        &self,
        key: &str,
        operation: &str,
        error: RankingError,
        request: PageRequest,
    ) -> RankPage {
        warn!(key = %key, operation, error = %error, "Live ranking read failed, returning empty page");
        metrics::record_degraded_read(operation);
        RankPage::empty(request.page, request.size)
    }
}
