use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub traffic: f64,
    pub engagement: f64,
    /// Base intent plus the cost-per-click bonus.
    pub intent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationScore {
    pub total: u32,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Weak,
    Inconclusive,
    Promising,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetail {
    pub name: String,
    /// Progress towards the target, in [0, 1].
    pub ratio: f64,
    pub weight: f64,
    pub points: f64,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub score: ValidationScore,
    pub verdict: Verdict,
    pub engagement_rate: f64,
    pub lead_rate: f64,
    pub cost_per_click: Option<f64>,
    pub cpc_bonus: f64,
    pub components: Vec<ComponentDetail>,
}

/// Upper bounds for the configurable weights. Sub-scores never exceed these.
pub const MAX_TRAFFIC_WEIGHT: f64 = 30.0;
pub const MAX_ENGAGEMENT_WEIGHT: f64 = 40.0;
pub const MAX_INTENT_WEIGHT: f64 = 30.0;
pub const MAX_CPC_BONUS_WEIGHT: f64 = 5.0;

/// Tunable constants of the validation score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Visitors needed for full traffic credit.
    pub traffic_target_visitors: f64,
    /// Pricing clicks per visitor treated as excellent engagement.
    pub engagement_target_rate: f64,
    /// Leads per visitor treated as full intent.
    pub intent_target_rate: f64,
    /// Cost per click (dollars) at or below which the bonus saturates.
    pub reference_cpc_dollars: f64,
    pub traffic_weight: f64,
    pub engagement_weight: f64,
    pub intent_weight: f64,
    pub cpc_bonus_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            traffic_target_visitors: 100.0,
            engagement_target_rate: 0.08,
            intent_target_rate: 0.02,
            reference_cpc_dollars: 2.00,
            traffic_weight: 30.0,
            engagement_weight: 40.0,
            intent_weight: 30.0,
            cpc_bonus_weight: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictThresholds {
    pub weak_threshold: u32,
    pub strong_threshold: u32,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        VerdictThresholds {
            weak_threshold: 40,
            strong_threshold: 70,
        }
    }
}
