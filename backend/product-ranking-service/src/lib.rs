//! Product ranking service
//!
//! Reads the live per-day product leaderboard kept in a Redis sorted set and
//! rolls it up into daily, weekly and monthly rankings stored in PostgreSQL.

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod keys;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use codec::MemberCodec;
pub use config::Config;
pub use error::{RankingError, Result};
pub use jobs::{PipelineOrchestrator, PipelineReport, PipelineState, RankingScheduler};
pub use keys::RankingKey;
pub use ledger::{InMemoryRankingLedger, PgRankingLedger, RankingLedger};
pub use models::{DailyRanking, MonthlyRanking, ProductId, RankPage, RankedProduct, WeeklyRanking};
pub use services::{RankingReader, StageOutcome};
pub use store::{InMemoryOrderedSetStore, OrderedSetStore, RedisOrderedSetStore};
