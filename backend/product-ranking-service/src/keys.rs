//! Live ranking key schema
//!
//! External event writers populate one ordered set per calendar day, so the
//! key format is a wire contract.
//! Key format: {prefix}:{YYYYMMDD}

use chrono::NaiveDate;

/// Namespace of the weighted all-metrics daily set
pub const DEFAULT_KEY_PREFIX: &str = "metric.product.all";

/// Builds per-day ordered-set keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingKey {
    prefix: String,
}

impl Default for RankingKey {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl RankingKey {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Format: metric.product.all:20250115
    pub fn day(&self, date: NaiveDate) -> String {
        format!("{}:{}", self.prefix, date.format("%Y%m%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(RankingKey::default().day(date), "metric.product.all:20250115");
    }

    #[test]
    fn test_custom_prefix() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let keys = RankingKey::new("metric.product.like");
        assert_eq!(keys.day(date), "metric.product.like:20250201");
        assert_eq!(keys.prefix(), "metric.product.like");
    }
}
