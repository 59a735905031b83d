// ============================================
// Ranking Jobs
// ============================================
//
// pipeline:  one Daily -> Weekly|Monthly run for a reference date
// scheduler: fires the pipeline once a day (--mode scheduler)
//
// A single run can also be triggered with `--mode run --date YYYY-MM-DD`.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{Branch, PipelineOrchestrator, PipelineReport, PipelineState};
pub use scheduler::{next_run_after, reference_date, RankingScheduler};
