//! Data access contract the host supplies to the dashboard and settings
//! panel, plus the record types it returns.

pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::feedback::FeedbackResponse;
use crate::intervention::InterventionKind;
use crate::settings::{Settings, SettingsPatch};

pub use mock::MockApi;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub typing_events: u64,
    pub app_switches: u64,
    pub overload_detections: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Typing,
    AppSwitch,
    Overload,
    Intervention,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl EventRecord {
    /// Foreground application recorded with the event, if any.
    pub fn app(&self) -> Option<&str> {
        self.meta.get("app").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterventionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InterventionKind,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Lists are ordered most-recent-first and hold at most `limit` entries.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn get_stats(&self) -> Result<Stats, FetchError>;

    async fn get_events(&self, limit: usize) -> Result<Vec<EventRecord>, FetchError>;

    async fn get_recent_interventions(
        &self,
        limit: usize,
    ) -> Result<Vec<InterventionRecord>, FetchError>;

    /// Records a new intervention and returns it as the acknowledgement.
    async fn trigger_intervention(&self) -> Result<InterventionRecord, FetchError>;

    async fn get_settings(&self) -> Result<Settings, FetchError>;

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, FetchError>;

    async fn record_feedback(
        &self,
        _intervention_id: &str,
        _response: &FeedbackResponse,
    ) -> Result<(), FetchError> {
        Ok(())
    }
}
