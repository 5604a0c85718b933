use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Funnel counters for one project over one date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub visitors: i64,
    pub pricing_clicks_total: i64,
    pub leads: i64,
}

impl Metrics {
    /// Copy with every counter floored at zero. Rows written by older clients
    /// are not validated, so negative counts are possible on read.
    pub fn clamped(&self) -> Metrics {
        Metrics {
            visitors: self.visitors.max(0),
            pricing_clicks_total: self.pricing_clicks_total.max(0),
            leads: self.leads.max(0),
        }
    }
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<DateRange, String> {
        if start > end {
            return Err(format!(
                "INVALID_RANGE: start date {start} is after end date {end}"
            ));
        }
        Ok(DateRange { start, end })
    }

    /// Parses `YYYY-MM-DD` bounds. Both or neither must be given.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Option<DateRange>, String> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                let start = parse_date(start)?;
                let end = parse_date(end)?;
                DateRange::new(start, end).map(Some)
            }
            _ => Err("INVALID_RANGE: both start and end dates are required".to_string()),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("INVALID_RANGE: could not parse date '{raw}': {e}"))
}

/// Read side of the metrics aggregator.
pub trait MetricsSource {
    fn load_metrics(&self, project_id: &str, range: Option<&DateRange>) -> Result<Metrics, String>;
}
