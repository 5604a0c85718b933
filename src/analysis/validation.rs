use crate::models::ad_spend::AdSpendRecord;
use crate::models::metrics::Metrics;
use crate::models::score::*;

/// Compute the 0–100 validation score for a metrics snapshot and an optional
/// ad spend record. Never fails: degenerate ratios resolve to zero, and the
/// cost-per-click bonus is skipped when spend or clicks are missing.
pub fn compute_score(
    metrics: &Metrics,
    ad_spend: Option<&AdSpendRecord>,
    config: &ScoringConfig,
) -> ValidationScore {
    let parts = score_parts(metrics, ad_spend, config);
    ValidationScore {
        total: parts.total(),
        breakdown: parts.breakdown(),
    }
}

/// Same computation as [`compute_score`], with the funnel rates, per
/// component details and a verdict for display.
pub fn compute_report(
    metrics: &Metrics,
    ad_spend: Option<&AdSpendRecord>,
    config: &ScoringConfig,
    thresholds: &VerdictThresholds,
) -> ScoreReport {
    let parts = score_parts(metrics, ad_spend, config);
    let m = metrics.clamped();
    let total = parts.total();

    let bonus_details = match parts.cost_per_click {
        Some(cpc) => vec![format!(
            "CPC ${cpc:.2} against a ${:.2} reference",
            config.reference_cpc_dollars
        )],
        None => vec!["no ad spend recorded, CPC bonus skipped".to_string()],
    };

    ScoreReport {
        score: ValidationScore {
            total,
            breakdown: parts.breakdown(),
        },
        verdict: verdict_for(total, thresholds),
        engagement_rate: parts.engagement_rate,
        lead_rate: parts.lead_rate,
        cost_per_click: parts.cost_per_click,
        cpc_bonus: parts.bonus,
        components: vec![
            ComponentDetail {
                name: "traffic".to_string(),
                ratio: parts.traffic_ratio,
                weight: parts.traffic_weight,
                points: parts.traffic,
                details: vec![format!(
                    "{} of {} target visitors",
                    m.visitors, config.traffic_target_visitors
                )],
            },
            ComponentDetail {
                name: "engagement".to_string(),
                ratio: parts.engagement_ratio,
                weight: parts.engagement_weight,
                points: parts.engagement,
                details: vec![format!(
                    "{} pricing clicks ({:.2}% of visitors)",
                    m.pricing_clicks_total,
                    parts.engagement_rate * 100.0
                )],
            },
            ComponentDetail {
                name: "intent".to_string(),
                ratio: parts.intent_ratio,
                weight: parts.intent_weight,
                points: parts.intent_base,
                details: vec![format!(
                    "{} leads from {} visitors ({:.2}%)",
                    m.leads,
                    m.visitors,
                    parts.lead_rate * 100.0
                )],
            },
            ComponentDetail {
                name: "cpc_bonus".to_string(),
                ratio: parts.bonus_ratio,
                weight: parts.bonus_weight,
                points: parts.bonus,
                details: bonus_details,
            },
        ],
    }
}

pub fn verdict_for(total: u32, thresholds: &VerdictThresholds) -> Verdict {
    if total >= thresholds.strong_threshold {
        Verdict::Promising
    } else if total >= thresholds.weak_threshold {
        Verdict::Inconclusive
    } else {
        Verdict::Weak
    }
}

/// Cost per click in dollars, only when both spend and a positive click count
/// are known.
pub fn cost_per_click(ad_spend: &AdSpendRecord) -> Option<f64> {
    let spend = ad_spend.ad_spend_cents?.max(0);
    let clicks = ad_spend.clicks?.max(0);
    if clicks == 0 {
        return None;
    }
    Some(spend as f64 / 100.0 / clicks as f64)
}

#[derive(Debug, Clone, Copy)]
struct ScoreParts {
    engagement_rate: f64,
    lead_rate: f64,
    cost_per_click: Option<f64>,
    traffic_ratio: f64,
    engagement_ratio: f64,
    intent_ratio: f64,
    bonus_ratio: f64,
    traffic_weight: f64,
    engagement_weight: f64,
    intent_weight: f64,
    bonus_weight: f64,
    traffic: f64,
    engagement: f64,
    intent_base: f64,
    bonus: f64,
}

impl ScoreParts {
    fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            traffic: self.traffic,
            engagement: self.engagement,
            intent: self.intent_base + self.bonus,
        }
    }

    fn total(&self) -> u32 {
        let sum = self.traffic + self.engagement + self.intent_base + self.bonus;
        if !sum.is_finite() {
            return 0;
        }
        sum.round().clamp(0.0, 100.0) as u32
    }
}

fn score_parts(
    metrics: &Metrics,
    ad_spend: Option<&AdSpendRecord>,
    config: &ScoringConfig,
) -> ScoreParts {
    let m = metrics.clamped();

    let traffic_ratio = if m.visitors == 0 {
        0.0
    } else {
        capped_ratio(m.visitors as f64, config.traffic_target_visitors)
    };

    let engagement_rate = per_visitor(m.pricing_clicks_total, m.visitors);
    let engagement_ratio = capped_ratio(engagement_rate, config.engagement_target_rate);

    let lead_rate = per_visitor(m.leads, m.visitors);
    let intent_ratio = capped_ratio(lead_rate, config.intent_target_rate);

    let cpc = ad_spend.and_then(cost_per_click);
    let bonus_ratio = cpc
        .map(|cpc| cpc_bonus_ratio(cpc, config.reference_cpc_dollars))
        .unwrap_or(0.0);

    let traffic_weight = weight(config.traffic_weight, MAX_TRAFFIC_WEIGHT);
    let engagement_weight = weight(config.engagement_weight, MAX_ENGAGEMENT_WEIGHT);
    let intent_weight = weight(config.intent_weight, MAX_INTENT_WEIGHT);
    let bonus_weight = weight(config.cpc_bonus_weight, MAX_CPC_BONUS_WEIGHT);

    ScoreParts {
        engagement_rate,
        lead_rate,
        cost_per_click: cpc,
        traffic_ratio,
        engagement_ratio,
        intent_ratio,
        bonus_ratio,
        traffic_weight,
        engagement_weight,
        intent_weight,
        bonus_weight,
        traffic: traffic_ratio * traffic_weight,
        engagement: engagement_ratio * engagement_weight,
        intent_base: intent_ratio * intent_weight,
        bonus: bonus_ratio * bonus_weight,
    }
}

fn per_visitor(count: i64, visitors: i64) -> f64 {
    if visitors <= 0 {
        return 0.0;
    }
    count.max(0) as f64 / visitors as f64
}

/// `min(1, value / target)`; a target that is not a positive number gives no
/// credit.
fn capped_ratio(value: f64, target: f64) -> f64 {
    if !(target.is_finite() && target > 0.0) || !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    (value / target).min(1.0)
}

/// Free clicks saturate the bonus.
fn cpc_bonus_ratio(cpc: f64, reference: f64) -> f64 {
    if !(reference.is_finite() && reference > 0.0) || !cpc.is_finite() {
        return 0.0;
    }
    if cpc <= 0.0 {
        return 1.0;
    }
    (reference / cpc).min(1.0)
}

/// Configured weight limited to `[0, ceiling]`.
fn weight(w: f64, ceiling: f64) -> f64 {
    if w.is_finite() {
        w.clamp(0.0, ceiling)
    } else {
        0.0
    }
}
