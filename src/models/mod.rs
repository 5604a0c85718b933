pub mod ad_spend;
pub mod event;
pub mod metrics;
pub mod score;
