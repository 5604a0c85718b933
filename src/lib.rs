pub mod analysis;
pub mod commands;
pub mod models;

pub use analysis::validation::{compute_report, compute_score};
pub use models::ad_spend::AdSpendRecord;
pub use models::metrics::Metrics;
pub use models::score::{ScoreBreakdown, ScoringConfig, ValidationScore};
