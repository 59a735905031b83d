//! Ordered-set store seam
//!
//! The live daily ranking is a score -> member index (Redis sorted set in
//! production). Ordering contract, shared by every implementation:
//! - highest score first
//! - equal scores in descending member order (`ZREVRANGE` semantics)
//! - ranges are zero-based and inclusive on both ends

mod memory;
mod redis_store;

pub use memory::InMemoryOrderedSetStore;
pub use redis_store::RedisOrderedSetStore;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait OrderedSetStore: Send + Sync {
    /// Zero-based position from the top, `None` when the member is absent
    async fn rank(&self, key: &str, member: &str) -> Result<Option<u64>>;

    /// Members between `start` and `end` (inclusive), highest score first
    async fn reverse_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<String>>;

    /// Same as [`OrderedSetStore::reverse_range`] with each member's score
    async fn reverse_range_with_scores(
        &self,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<(String, f64)>>;

    /// Member count; `0` when the key does not exist
    async fn cardinality(&self, key: &str) -> Result<u64>;
}
