use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{EventRecord, InterventionRecord, Stats};

/// Everything one refresh cycle fetched. Replaced as a whole, never merged.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stats: Stats,
    pub events: Vec<EventRecord>,
    pub interventions: Vec<InterventionRecord>,
    pub fetched_at: DateTime<Utc>,
}
