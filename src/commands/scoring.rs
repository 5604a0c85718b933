use crate::analysis::contrast::{pick_text_tone, sample_luminance, Region, TextTone};
use crate::analysis::validation::{compute_report, compute_score};
use crate::models::ad_spend::AdSpendSource;
use crate::models::metrics::{DateRange, Metrics, MetricsSource};
use crate::models::score::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToneSuggestion {
    pub tone: TextTone,
    pub luminance: Option<f64>,
}

/// Reads both collaborators and scores the project.
pub fn score_project<S>(
    source: &S,
    project_id: &str,
    range: Option<&DateRange>,
    config: &ScoringConfig,
) -> Result<ValidationScore, String>
where
    S: MetricsSource + AdSpendSource,
{
    let metrics = source.load_metrics(project_id, range)?;
    let ad_spend = source.load_ad_spend(project_id)?;
    Ok(compute_score(&metrics, ad_spend.as_ref(), config))
}

pub fn report_project<S>(
    source: &S,
    project_id: &str,
    range: Option<&DateRange>,
    config: &ScoringConfig,
    thresholds: &VerdictThresholds,
) -> Result<ScoreReport, String>
where
    S: MetricsSource + AdSpendSource,
{
    let metrics = source.load_metrics(project_id, range)?;
    let ad_spend = source.load_ad_spend(project_id)?;
    Ok(compute_report(&metrics, ad_spend.as_ref(), config, thresholds))
}

pub async fn get_metrics(
    workspace_path: String,
    project_id: String,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<Metrics, String> {
    let range = DateRange::parse(start_date.as_deref(), end_date.as_deref())?;
    let conn = crate::commands::db::get_db_connection(&workspace_path)?;
    conn.load_metrics(&project_id, range.as_ref())
}

pub async fn get_validation_score(
    workspace_path: String,
    project_id: String,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<ValidationScore, String> {
    let range = DateRange::parse(start_date.as_deref(), end_date.as_deref())?;
    let settings = crate::commands::settings::load_effective_scoring_settings(&workspace_path)?;
    let conn = crate::commands::db::get_db_connection(&workspace_path)?;

    let score = score_project(&conn, &project_id, range.as_ref(), &settings.scoring)?;
    log::info!("validation score for {project_id}: {}", score.total);
    Ok(score)
}

pub async fn get_score_report(
    workspace_path: String,
    project_id: String,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<ScoreReport, String> {
    let range = DateRange::parse(start_date.as_deref(), end_date.as_deref())?;
    let settings = crate::commands::settings::load_effective_scoring_settings(&workspace_path)?;
    let conn = crate::commands::db::get_db_connection(&workspace_path)?;

    report_project(
        &conn,
        &project_id,
        range.as_ref(),
        &settings.scoring,
        &settings.thresholds,
    )
}

/// Picks a text colour for copy laid over `region` of an RGBA8 image.
/// The whole image is sampled when no region is given.
pub async fn suggest_text_tone(
    workspace_path: String,
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    region: Option<Region>,
) -> Result<TextToneSuggestion, String> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| format!("INVALID_INPUT: image of {width}x{height} is too large"))?;
    if pixels.len() < expected {
        return Err(format!(
            "INVALID_INPUT: expected {expected} RGBA bytes for {width}x{height}, got {}",
            pixels.len()
        ));
    }

    let settings = crate::commands::settings::load_effective_scoring_settings(&workspace_path)?;
    let region = region.unwrap_or_else(|| Region::full(width, height));
    let luminance = sample_luminance(&pixels, width, height, region, settings.contrast_sample_step);

    Ok(TextToneSuggestion {
        tone: pick_text_tone(luminance, settings.contrast_threshold),
        luminance,
    })
}
