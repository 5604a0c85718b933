use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Visit,
    PricingClick,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Visit => "visit",
            EventKind::PricingClick => "pricing_click",
        }
    }

    pub fn parse(raw: &str) -> Result<EventKind, String> {
        match raw {
            "visit" => Ok(EventKind::Visit),
            "pricing_click" => Ok(EventKind::PricingClick),
            other => Err(format!("INVALID_INPUT: unknown event kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEvent {
    pub id: String,
    pub project_id: String,
    pub kind: EventKind,
    pub visitor_id: String,
    pub occurred_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub project_id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: i64,
}
