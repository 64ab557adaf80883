use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A failed request recorded by the vLLM test harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub id: i64,
    #[serde(rename = "created_at")]
    pub occurred_at: DateTime<Utc>,
    #[serde(rename = "error_message")]
    pub message: Option<String>,
}

impl ErrorEvent {
    pub fn new(id: i64, occurred_at: DateTime<Utc>, message: Option<String>) -> Self {
        Self {
            id,
            occurred_at,
            message,
        }
    }
}
