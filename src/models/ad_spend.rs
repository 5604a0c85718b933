use serde::{Deserialize, Serialize};

/// Ad campaign numbers the user typed in for a test run. `None` means the
/// field was never filled in, which is not the same as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSpendRecord {
    pub ad_spend_cents: Option<i64>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    pub id: String,
    pub project_id: String,
    pub ad_spend_cents: Option<i64>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TestRun {
    pub fn ad_spend(&self) -> AdSpendRecord {
        AdSpendRecord {
            ad_spend_cents: self.ad_spend_cents,
            impressions: self.impressions,
            clicks: self.clicks,
        }
    }

    /// Entry-time checks. Stored rows are trusted no further than the engine's
    /// own clamping.
    pub fn validate(&self) -> Result<(), String> {
        if self.project_id.trim().is_empty() {
            return Err("INVALID_INPUT: project_id is required".to_string());
        }
        for (field, value) in [
            ("ad_spend_cents", self.ad_spend_cents),
            ("impressions", self.impressions),
            ("clicks", self.clicks),
        ] {
            if matches!(value, Some(v) if v < 0) {
                return Err(format!("INVALID_INPUT: {field} must not be negative"));
            }
        }
        if let (Some(clicks), Some(impressions)) = (self.clicks, self.impressions) {
            if clicks > impressions {
                return Err(format!(
                    "INVALID_INPUT: clicks ({clicks}) cannot exceed impressions ({impressions})"
                ));
            }
        }
        Ok(())
    }
}

/// Read side of the ad spend record.
pub trait AdSpendSource {
    fn load_ad_spend(&self, project_id: &str) -> Result<Option<AdSpendRecord>, String>;
}
