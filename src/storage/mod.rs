use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod database;
pub mod migrations;

/// Unique processing run identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Processing,
    Complete,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Processing => write!(f, "processing"),
            RunStatus::Complete => write!(f, "complete"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One attempt at processing a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRun {
    pub id: RunId,
    pub record_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub forced: bool,
    pub total_score: Option<u32>,
    pub category: Option<String>,
    pub error: Option<String>,
}

impl ProcessingRun {
    pub fn new(record_id: &str, forced: bool) -> Self {
        Self {
            id: RunId::new(),
            record_id: record_id.to_string(),
            status: RunStatus::Processing,
            started_at: Utc::now(),
            finished_at: None,
            forced,
            total_score: None,
            category: None,
            error: None,
        }
    }

    /// Still marked as processing but started before `stale_after` ago.
    pub fn is_stale(&self, stale_after: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.status == RunStatus::Processing && now - self.started_at > stale_after
    }
}
