use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use super::OrderedSetStore;
use crate::error::{RankingError, Result};

/// Redis sorted-set backed store.
///
/// `ConnectionManager` reconnects on its own; each call clones its own handle.
#[derive(Clone)]
pub struct RedisOrderedSetStore {
    conn: ConnectionManager,
}

impl RedisOrderedSetStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Redis connection manager initialized");
        Ok(Self::new(conn))
    }
}

fn to_index(value: u64) -> Result<isize> {
    isize::try_from(value)
        .map_err(|_| RankingError::InvalidArgument(format!("range index {} out of bounds", value)))
}

#[async_trait]
impl OrderedSetStore for RedisOrderedSetStore {
    async fn rank(&self, key: &str, member: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let rank: Option<u64> = conn.zrevrank(key, member).await?;
        Ok(rank)
    }

    async fn reverse_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();

        // ZREVRANGE key start end
        let members: Vec<String> = conn
            .zrevrange(key, to_index(start)?, to_index(end)?)
            .await?;

        debug!(key = %key, start, end, count = members.len(), "ZREVRANGE");
        Ok(members)
    }

    async fn reverse_range_with_scores(
        &self,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<(String, f64)>> {
        let mut conn = self.conn.clone();

        // ZREVRANGE key start end WITHSCORES
        let entries: Vec<(String, f64)> = conn
            .zrevrange_withscores(key, to_index(start)?, to_index(end)?)
            .await?;

        debug!(key = %key, start, end, count = entries.len(), "ZREVRANGE WITHSCORES");
        Ok(entries)
    }

    async fn cardinality(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }
}
