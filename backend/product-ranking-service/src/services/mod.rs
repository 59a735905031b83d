pub mod aggregation;
pub mod reader;

pub use aggregation::{
    rollup, DailyAggregation, RollupAggregation, StageOutcome, DEFAULT_DAILY_TOP_N,
};
pub use reader::RankingReader;
