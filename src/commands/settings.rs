use crate::analysis::contrast::DEFAULT_LUMINANCE_THRESHOLD;
use crate::models::score::{
    ScoringConfig, VerdictThresholds, MAX_CPC_BONUS_WEIGHT, MAX_ENGAGEMENT_WEIGHT,
    MAX_INTENT_WEIGHT, MAX_TRAFFIC_WEIGHT,
};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;

#[derive(Debug, Clone)]
pub struct EffectiveScoringSettings {
    pub scoring: ScoringConfig,
    pub thresholds: VerdictThresholds,
    pub contrast_threshold: f64,
    pub contrast_sample_step: u32,
}

pub async fn get_settings(workspace_path: String) -> Result<Value, String> {
    load_settings_from_disk(&workspace_path)
}

pub async fn save_settings(workspace_path: String, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&workspace_path, settings)
}

pub fn load_effective_scoring_settings(workspace_path: &str) -> Result<EffectiveScoringSettings, String> {
    let settings = load_settings_from_disk(workspace_path)?;
    Ok(effective_settings(&settings))
}

/// Typed view over an already migrated settings document.
pub fn effective_settings(settings: &Value) -> EffectiveScoringSettings {
    let defaults = ScoringConfig::default();
    let scoring = settings.get("scoring");
    let number = |key: &str, default: f64| {
        scoring
            .and_then(|s| s.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(default)
    };
    let weight = |key: &str, default: f64| {
        scoring
            .and_then(|s| s.get("weights"))
            .and_then(|w| w.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(default)
    };

    let default_thresholds = VerdictThresholds::default();

    EffectiveScoringSettings {
        scoring: ScoringConfig {
            traffic_target_visitors: number("trafficTargetVisitors", defaults.traffic_target_visitors),
            engagement_target_rate: number("engagementTargetRate", defaults.engagement_target_rate),
            intent_target_rate: number("intentTargetRate", defaults.intent_target_rate),
            reference_cpc_dollars: number("referenceCpcDollars", defaults.reference_cpc_dollars),
            traffic_weight: weight("traffic", defaults.traffic_weight),
            engagement_weight: weight("engagement", defaults.engagement_weight),
            intent_weight: weight("intent", defaults.intent_weight),
            cpc_bonus_weight: weight("cpcBonus", defaults.cpc_bonus_weight),
        },
        thresholds: VerdictThresholds {
            weak_threshold: settings
                .get("weakThreshold")
                .and_then(Value::as_u64)
                .map(|v| v as u32)
                .unwrap_or(default_thresholds.weak_threshold),
            strong_threshold: settings
                .get("strongThreshold")
                .and_then(Value::as_u64)
                .map(|v| v as u32)
                .unwrap_or(default_thresholds.strong_threshold),
        },
        contrast_threshold: settings
            .get("contrastThreshold")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_LUMINANCE_THRESHOLD),
        contrast_sample_step: settings
            .get("contrastSampleStep")
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(8),
    }
}

pub fn load_settings_from_disk(workspace_path: &str) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_ideascore_dir(workspace_path)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => value,
            Err(e) => {
                let backup = path.with_extension("json.bak");
                fs::rename(&path, &backup)
                    .map_err(|e| format!("Failed to back up settings.json: {e}"))?;
                log::warn!(
                    "settings.json is not valid JSON ({e}), moved to {} and reset to defaults",
                    backup.display()
                );
                json!({})
            }
        }
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(workspace_path: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_ideascore_dir(workspace_path)?;

    let mut merged = load_settings_from_disk(workspace_path).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    log::info!("saved settings to {}", path.display());
    Ok(migrated)
}

fn settings_path(workspace_path: &str) -> PathBuf {
    Path::new(workspace_path)
        .join(".ideascore")
        .join("settings.json")
}

fn ensure_ideascore_dir(workspace_path: &str) -> Result<(), String> {
    let dir = Path::new(workspace_path).join(".ideascore");
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create .ideascore directory: {e}"))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        migrate_rates_from_percentages(&mut out);
    }

    if version < 2 {
        // V2 introduces the hero-image contrast keys.
        ensure_key(&mut out, "contrastThreshold", json!(DEFAULT_LUMINANCE_THRESHOLD));
        ensure_key(&mut out, "contrastSampleStep", json!(8));
    }

    deep_merge_defaults(&mut out, &default_settings());
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    let scoring = ScoringConfig::default();
    let thresholds = VerdictThresholds::default();
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "scoring": {
            "trafficTargetVisitors": scoring.traffic_target_visitors,
            "engagementTargetRate": scoring.engagement_target_rate,
            "intentTargetRate": scoring.intent_target_rate,
            "referenceCpcDollars": scoring.reference_cpc_dollars,
            "weights": {
                "traffic": scoring.traffic_weight,
                "engagement": scoring.engagement_weight,
                "intent": scoring.intent_weight,
                "cpcBonus": scoring.cpc_bonus_weight
            }
        },
        "weakThreshold": thresholds.weak_threshold,
        "strongThreshold": thresholds.strong_threshold,
        "contrastThreshold": DEFAULT_LUMINANCE_THRESHOLD,
        "contrastSampleStep": 8
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                } else if default_value.is_object() {
                    *existing = default_value.clone();
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

/// Pre-V1 files stored the engagement and intent targets as percentages (8, 2).
fn migrate_rates_from_percentages(settings: &mut Value) {
    let Some(scoring) = settings.get_mut("scoring").and_then(Value::as_object_mut) else {
        return;
    };

    for key in ["engagementTargetRate", "intentTargetRate"] {
        if let Some(v) = scoring.get(key).and_then(Value::as_f64) {
            if v > 1.0 {
                scoring.insert(key.to_string(), json!(v / 100.0));
            }
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "weakThreshold", 0, 100, 40);
    let weak = obj.get("weakThreshold").and_then(Value::as_u64).unwrap_or(40);
    clamp_u64(obj, "strongThreshold", weak, 100, 70.max(weak));
    clamp_f64(obj, "contrastThreshold", 0.0, 1.0, DEFAULT_LUMINANCE_THRESHOLD);
    clamp_u64(obj, "contrastSampleStep", 1, 64, 8);

    let defaults = ScoringConfig::default();
    let scoring = obj
        .entry("scoring".to_string())
        .or_insert_with(|| json!({}));
    let Some(scoring_obj) = scoring.as_object_mut() else {
        return;
    };

    clamp_f64(scoring_obj, "trafficTargetVisitors", 1.0, 1_000_000.0, defaults.traffic_target_visitors);
    clamp_f64(scoring_obj, "engagementTargetRate", 0.0001, 1.0, defaults.engagement_target_rate);
    clamp_f64(scoring_obj, "intentTargetRate", 0.0001, 1.0, defaults.intent_target_rate);
    clamp_f64(scoring_obj, "referenceCpcDollars", 0.01, 1000.0, defaults.reference_cpc_dollars);

    let weights = scoring_obj
        .entry("weights".to_string())
        .or_insert_with(|| json!({}));
    if !weights.is_object() {
        *weights = json!({});
    }
    if let Some(weight_obj) = weights.as_object_mut() {
        clamp_f64(weight_obj, "traffic", 0.0, MAX_TRAFFIC_WEIGHT, defaults.traffic_weight);
        clamp_f64(weight_obj, "engagement", 0.0, MAX_ENGAGEMENT_WEIGHT, defaults.engagement_weight);
        clamp_f64(weight_obj, "intent", 0.0, MAX_INTENT_WEIGHT, defaults.intent_weight);
        clamp_f64(weight_obj, "cpcBonus", 0.0, MAX_CPC_BONUS_WEIGHT, defaults.cpc_bonus_weight);
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_default_scoring_config() {
        let migrated = migrate_settings(json!({}));
        let effective = effective_settings(&migrated);

        assert_eq!(effective.scoring, ScoringConfig::default());
        assert_eq!(effective.thresholds, VerdictThresholds::default());
        assert_eq!(effective.contrast_sample_step, 8);
        assert_eq!(migrated["schema_version"], json!(SETTINGS_SCHEMA_VERSION));
    }

    #[test]
    fn migrates_percentage_rates_to_fractions() {
        let input = json!({
            "schema_version": 0,
            "scoring": {
                "engagementTargetRate": 8,
                "intentTargetRate": 2
            }
        });

        let effective = effective_settings(&migrate_settings(input));
        assert!((effective.scoring.engagement_target_rate - 0.08).abs() < 1e-9);
        assert!((effective.scoring.intent_target_rate - 0.02).abs() < 1e-9);
    }

    #[test]
    fn current_version_rates_are_not_rescaled() {
        let input = json!({
            "schema_version": SETTINGS_SCHEMA_VERSION,
            "scoring": { "engagementTargetRate": 0.5 }
        });

        let effective = effective_settings(&migrate_settings(input));
        assert!((effective.scoring.engagement_target_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn merges_partial_settings_without_losing_existing_values() {
        let mut existing = default_settings();
        merge_settings(&mut existing, &json!({ "scoring": { "referenceCpcDollars": 1.5 } }));
        let migrated = migrate_settings(existing);

        assert_eq!(migrated["scoring"]["referenceCpcDollars"], json!(1.5));
        assert_eq!(migrated["scoring"]["trafficTargetVisitors"], json!(100.0));
        assert_eq!(migrated["scoring"]["weights"]["engagement"], json!(40.0));
        assert_eq!(migrated["strongThreshold"], json!(70));
    }

    #[test]
    fn sanitizes_out_of_range_and_malformed_values() {
        let input = json!({
            "schema_version": SETTINGS_SCHEMA_VERSION,
            "scoring": {
                "trafficTargetVisitors": 0,
                "intentTargetRate": -3,
                "weights": "heavy"
            },
            "weakThreshold": 80,
            "strongThreshold": 50,
            "contrastSampleStep": 0
        });

        let effective = effective_settings(&migrate_settings(input));
        assert_eq!(effective.scoring.traffic_target_visitors, 1.0);
        assert!(effective.scoring.intent_target_rate > 0.0);
        assert_eq!(effective.scoring.traffic_weight, 30.0);
        assert_eq!(effective.thresholds.weak_threshold, 80);
        assert_eq!(effective.thresholds.strong_threshold, 80);
        assert_eq!(effective.contrast_sample_step, 1);
    }

    #[test]
    fn weights_are_capped_at_their_ceilings() {
        let input = json!({
            "schema_version": SETTINGS_SCHEMA_VERSION,
            "scoring": {
                "weights": { "traffic": 100, "engagement": 100, "intent": 100, "cpcBonus": 100 }
            }
        });

        let effective = effective_settings(&migrate_settings(input));
        assert_eq!(effective.scoring.traffic_weight, 30.0);
        assert_eq!(effective.scoring.engagement_weight, 40.0);
        assert_eq!(effective.scoring.intent_weight, 30.0);
        assert_eq!(effective.scoring.cpc_bonus_weight, 5.0);
    }

    #[test]
    fn non_object_settings_are_replaced_with_defaults() {
        let migrated = migrate_settings(json!([1, 2, 3]));
        assert!(migrated.get("scoring").is_some());
        assert_eq!(effective_settings(&migrated).scoring, ScoringConfig::default());
    }
}
