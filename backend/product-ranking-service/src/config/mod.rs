use chrono::{FixedOffset, NaiveTime};
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::codec::DEFAULT_MEMBER_WIDTH;
use crate::error::{RankingError, Result};
use crate::keys::DEFAULT_KEY_PREFIX;
use crate::services::DEFAULT_DAILY_TOP_N;

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub ranking: RankingConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    /// Only needed when the Postgres ledger is used
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub run_migrations: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub key_prefix: String,
    /// 0 selects the legacy unpadded member encoding
    pub member_width: usize,
    pub daily_top_n: u64,
}

/// Local wall-clock time of the daily run
#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

/// Read `name`, falling back to `default` when unset. A value that is set
/// but does not parse is an error.
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            RankingError::Config(format!("{} has invalid value '{}': {}", name, raw, e))
        }),
        Err(_) => Ok(default),
    }
}

impl ScheduleConfig {
    fn from_env() -> Result<Self> {
        let hour: u32 = parse_env("RANKING_SCHEDULE_HOUR", 0)?;
        let minute: u32 = parse_env("RANKING_SCHEDULE_MINUTE", 0)?;
        let second: u32 = parse_env("RANKING_SCHEDULE_SECOND", 5)?;
        let offset_minutes: i32 = parse_env("RANKING_SCHEDULE_UTC_OFFSET_MINUTES", 540)?;

        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            RankingError::Config(format!(
                "invalid schedule time {:02}:{:02}:{:02}",
                hour, minute, second
            ))
        })?;

        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                RankingError::Config(format!(
                    "RANKING_SCHEDULE_UTC_OFFSET_MINUTES out of range: {}",
                    offset_minutes
                ))
            })?;

        Ok(Self { time, offset })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let min_connections: u32 = parse_env("DB_MIN_CONNECTIONS", 1)?;
        let max_connections: u32 = parse_env("DB_MAX_CONNECTIONS", 5)?;
        if max_connections == 0 || min_connections > max_connections {
            return Err(RankingError::Config(format!(
                "DB_MIN_CONNECTIONS ({}) must not exceed DB_MAX_CONNECTIONS ({}), which must be > 0",
                min_connections, max_connections
            )));
        }

        let daily_top_n: u64 = parse_env("RANKING_DAILY_TOP_N", DEFAULT_DAILY_TOP_N)?;
        if daily_top_n == 0 {
            return Err(RankingError::Config(
                "RANKING_DAILY_TOP_N must be > 0".to_string(),
            ));
        }

        Ok(Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "product-ranking-service".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                max_connections,
                min_connections,
                connect_timeout_secs: parse_env("DB_CONNECT_TIMEOUT_SECS", 5)?,
                acquire_timeout_secs: parse_env("DB_ACQUIRE_TIMEOUT_SECS", 10)?,
                idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", 600)?,
                max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", 1800)?,
                run_migrations: parse_env("DB_RUN_MIGRATIONS", true)?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            ranking: RankingConfig {
                key_prefix: env::var("RANKING_KEY_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
                member_width: parse_env("RANKING_MEMBER_WIDTH", DEFAULT_MEMBER_WIDTH)?,
                daily_top_n,
            },
            schedule: ScheduleConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "SERVICE_NAME",
        "DATABASE_URL",
        "DB_MAX_CONNECTIONS",
        "DB_MIN_CONNECTIONS",
        "DB_RUN_MIGRATIONS",
        "REDIS_URL",
        "RANKING_KEY_PREFIX",
        "RANKING_MEMBER_WIDTH",
        "RANKING_DAILY_TOP_N",
        "RANKING_SCHEDULE_HOUR",
        "RANKING_SCHEDULE_MINUTE",
        "RANKING_SCHEDULE_SECOND",
        "RANKING_SCHEDULE_UTC_OFFSET_MINUTES",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert_eq!(config.service.service_name, "product-ranking-service");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.ranking.key_prefix, "metric.product.all");
        assert_eq!(config.ranking.member_width, 19);
        assert_eq!(config.ranking.daily_top_n, 100);
        assert_eq!(config.schedule.time, NaiveTime::from_hms_opt(0, 0, 5).unwrap());
        assert_eq!(config.schedule.offset.local_minus_utc(), 9 * 3600);
        assert!(config.database.run_migrations);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("RANKING_KEY_PREFIX", "metric.product.test");
        env::set_var("RANKING_MEMBER_WIDTH", "0");
        env::set_var("RANKING_DAILY_TOP_N", "50");
        env::set_var("RANKING_SCHEDULE_HOUR", "3");
        env::set_var("RANKING_SCHEDULE_UTC_OFFSET_MINUTES", "0");
        env::set_var("DB_RUN_MIGRATIONS", "false");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.ranking.key_prefix, "metric.product.test");
        assert_eq!(config.ranking.member_width, 0);
        assert_eq!(config.ranking.daily_top_n, 50);
        assert_eq!(config.schedule.time, NaiveTime::from_hms_opt(3, 0, 5).unwrap());
        assert_eq!(config.schedule.offset.local_minus_utc(), 0);
        assert!(!config.database.run_migrations);
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_config_errors() {
        clear_env();
        env::set_var("RANKING_DAILY_TOP_N", "lots");
        assert!(matches!(Config::from_env(), Err(RankingError::Config(_))));

        clear_env();
        env::set_var("RANKING_DAILY_TOP_N", "0");
        assert!(matches!(Config::from_env(), Err(RankingError::Config(_))));

        clear_env();
        env::set_var("RANKING_SCHEDULE_HOUR", "24");
        assert!(matches!(Config::from_env(), Err(RankingError::Config(_))));

        clear_env();
        env::set_var("DB_MIN_CONNECTIONS", "10");
        env::set_var("DB_MAX_CONNECTIONS", "2");
        assert!(matches!(Config::from_env(), Err(RankingError::Config(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_database_url_is_redacted() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://ranking:secret@db/ranking");

        let config = Config::from_env().unwrap();
        clear_env();

        let debug = format!("{:?}", config.database);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }
}
