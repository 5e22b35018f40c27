// Recurring Task Status (read model for dashboards / API)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a recurring task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTaskStatus {
    pub name: String,
    pub created: DateTime<Utc>,
    /// None until the first scheduled task is created
    pub last_run: Option<DateTime<Utc>>,
    /// `last_run` (or `created`) plus the interval
    pub expected_next_run: DateTime<Utc>,
    pub is_paused: bool,
}
