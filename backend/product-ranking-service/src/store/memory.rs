use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::OrderedSetStore;
use crate::error::Result;

type Sets = HashMap<String, HashMap<String, f64>>;

/// Process-local ordered-set store with Redis ordering semantics.
///
/// Backs `--dry-run` and the tests.
#[derive(Debug, Default)]
pub struct InMemoryOrderedSetStore {
    sets: Mutex<Sets>,
}

impl InMemoryOrderedSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sets> {
        self.sets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// ZADD: set the member's score
    pub fn insert(&self, key: &str, member: &str, score: f64) {
        self.lock()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
    }

    /// ZINCRBY: add `delta` to the member's score and return the new score
    pub fn increment(&self, key: &str, member: &str, delta: f64) -> f64 {
        let mut sets = self.lock();
        let score = sets
            .entry(key.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0);
        *score += delta;
        *score
    }

    /// DEL
    pub fn remove_key(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Full set in reverse order
    fn sorted(&self, key: &str) -> Vec<(String, f64)> {
        let sets = self.lock();
        let Some(set) = sets.get(key) else {
            return Vec::new();
        };

        let mut entries: Vec<(String, f64)> =
            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        entries.sort_by(|a, b| reverse_order(a, b));
        entries
    }

    fn slice(&self, key: &str, start: u64, end: u64) -> Vec<(String, f64)> {
        let entries = self.sorted(key);
        if entries.is_empty() || start > end {
            return Vec::new();
        }

        let last = entries.len() as u64 - 1;
        if start > last {
            return Vec::new();
        }

        let end = end.min(last);
        entries[start as usize..=end as usize].to_vec()
    }
}

/// Highest score first; equal scores by descending member
fn reverse_order(a: &(String, f64), b: &(String, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0))
}

#[async_trait]
impl OrderedSetStore for InMemoryOrderedSetStore {
    async fn rank(&self, key: &str, member: &str) -> Result<Option<u64>> {
        Ok(self
            .sorted(key)
            .iter()
            .position(|(m, _)| m == member)
            .map(|idx| idx as u64))
    }

    async fn reverse_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<String>> {
        Ok(self
            .slice(key, start, end)
            .into_iter()
            .map(|(member, _)| member)
            .collect())
    }

    async fn reverse_range_with_scores(
        &self,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<(String, f64)>> {
        Ok(self.slice(key, start, end))
    }

    async fn cardinality(&self, key: &str) -> Result<u64> {
        Ok(self.lock().get(key).map(|set| set.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryOrderedSetStore {
        let store = InMemoryOrderedSetStore::new();
        store.insert("k", "a", 1.0);
        store.insert("k", "b", 3.0);
        store.insert("k", "c", 2.0);
        store
    }

    #[tokio::test]
    async fn test_reverse_range_orders_by_score() {
        let store = store();
        assert_eq!(store.reverse_range("k", 0, 10).await.unwrap(), vec!["b", "c", "a"]);
        assert_eq!(store.reverse_range("k", 1, 1).await.unwrap(), vec!["c"]);
        assert!(store.reverse_range("k", 3, 5).await.unwrap().is_empty());
        assert!(store.reverse_range("k", 2, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_equal_scores_use_descending_member() {
        let store = InMemoryOrderedSetStore::new();
        store.insert("k", "696", 50.0);
        store.insert("k", "898", 50.0);
        store.insert("k", "797", 10.0);

        let entries = store.reverse_range_with_scores("k", 0, 99).await.unwrap();
        assert_eq!(
            entries,
            vec![
                ("898".to_string(), 50.0),
                ("696".to_string(), 50.0),
                ("797".to_string(), 10.0)
            ]
        );
    }

    #[tokio::test]
    async fn test_rank_and_cardinality() {
        let store = store();
        assert_eq!(store.rank("k", "b").await.unwrap(), Some(0));
        assert_eq!(store.rank("k", "a").await.unwrap(), Some(2));
        assert_eq!(store.rank("k", "zzz").await.unwrap(), None);
        assert_eq!(store.cardinality("k").await.unwrap(), 3);
        assert_eq!(store.cardinality("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_and_remove() {
        let store = store();
        assert_eq!(store.increment("k", "a", 5.0), 6.0);
        assert_eq!(store.rank("k", "a").await.unwrap(), Some(0));

        store.remove_key("k");
        assert_eq!(store.cardinality("k").await.unwrap(), 0);
    }
}
