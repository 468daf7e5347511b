use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::FetchError;
use crate::feedback::FeedbackResponse;
use crate::intervention::{InterventionKind, DEFAULT_DURATION_MS};
use crate::settings::{Settings, SettingsPatch, SettingsStore};

use super::{DataApi, EventKind, EventRecord, InterventionRecord, Stats};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const HISTORY_CAP: usize = 200;
const SEED_EVENTS: usize = 24;
const APPS: [&str; 6] = ["VS Code", "Slack", "Chrome", "Terminal", "Figma", "Mail"];

struct MockData {
    rng: StdRng,
    stats: Stats,
    events: VecDeque<EventRecord>,
    interventions: VecDeque<InterventionRecord>,
    feedback: Vec<(String, FeedbackResponse)>,
}

impl MockData {
    fn new(rng: StdRng) -> Self {
        let mut data = Self {
            rng,
            stats: Stats::default(),
            events: VecDeque::new(),
            interventions: VecDeque::new(),
            feedback: Vec::new(),
        };
        for _ in 0..SEED_EVENTS {
            data.simulate_event();
        }
        data
    }

    fn push_event(&mut self, kind: EventKind, meta: Map<String, Value>) {
        match kind {
            EventKind::Typing => self.stats.typing_events += 1,
            EventKind::AppSwitch => self.stats.app_switches += 1,
            EventKind::Overload => self.stats.overload_detections += 1,
            EventKind::Intervention => {}
        }
        self.events.push_front(EventRecord {
            id: Uuid::new_v4().to_string(),
            kind,
            timestamp: Utc::now(),
            meta,
        });
        self.events.truncate(HISTORY_CAP);
    }

    /// Typing dominates, app switches are common, overloads are rare.
    fn simulate_event(&mut self) {
        let roll: u32 = self.rng.gen_range(0..100);
        let kind = match roll {
            0..=59 => EventKind::Typing,
            60..=94 => EventKind::AppSwitch,
            _ => EventKind::Overload,
        };
        let app = APPS[self.rng.gen_range(0..APPS.len())];
        let mut meta = Map::new();
        meta.insert("app".into(), json!(app));
        if kind == EventKind::Typing {
            meta.insert("keysPerMinute".into(), json!(self.rng.gen_range(20..120)));
        }
        self.push_event(kind, meta);
    }

    fn simulate_activity(&mut self) {
        let burst = self.rng.gen_range(0..4);
        for _ in 0..burst {
            self.simulate_event();
        }
    }
}

/// Simulated collaborator backing the demo. Generates plausible activity
/// on every stats read.
pub struct MockApi {
    data: Mutex<MockData>,
    settings: SettingsStore,
    latency: Option<Range<u64>>,
    pending_failures: AtomicUsize,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Random data with 50–200 ms of simulated latency per call.
    pub fn new() -> Self {
        Self::build(StdRng::from_entropy(), Some(50..200))
    }

    /// Deterministic data and no latency.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(StdRng::seed_from_u64(seed), None)
    }

    fn build(rng: StdRng, latency: Option<Range<u64>>) -> Self {
        Self {
            data: Mutex::new(MockData::new(rng)),
            settings: SettingsStore::new(Settings::default()),
            latency,
            pending_failures: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency_ms: Range<u64>) -> Self {
        self.latency = (!latency_ms.is_empty()).then_some(latency_ms);
        self
    }

    /// Makes the next `count` calls fail.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    pub async fn feedback(&self) -> Vec<(String, FeedbackResponse)> {
        self.data.lock().await.feedback.clone()
    }

    async fn call(&self, operation: &'static str) -> Result<(), FetchError> {
        if let Some(range) = &self.latency {
            let delay = self.data.lock().await.rng.gen_range(range.clone());
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let failed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            log_warn!("mock api: simulated outage for {operation}");
            return Err(FetchError::unavailable(operation, "simulated outage"));
        }
        log_debug!("mock api: {operation}");
        Ok(())
    }
}

#[async_trait]
impl DataApi for MockApi {
    async fn get_stats(&self) -> Result<Stats, FetchError> {
        self.call("getStats").await?;
        let mut data = self.data.lock().await;
        data.simulate_activity();
        Ok(data.stats)
    }

    async fn get_events(&self, limit: usize) -> Result<Vec<EventRecord>, FetchError> {
        if limit == 0 {
            return Err(FetchError::InvalidLimit);
        }
        self.call("getEvents").await?;
        let data = self.data.lock().await;
        Ok(data.events.iter().take(limit).cloned().collect())
    }

    async fn get_recent_interventions(
        &self,
        limit: usize,
    ) -> Result<Vec<InterventionRecord>, FetchError> {
        if limit == 0 {
            return Err(FetchError::InvalidLimit);
        }
        self.call("getRecentInterventions").await?;
        let data = self.data.lock().await;
        Ok(data.interventions.iter().take(limit).cloned().collect())
    }

    async fn trigger_intervention(&self) -> Result<InterventionRecord, FetchError> {
        self.call("triggerIntervention").await?;
        let mut data = self.data.lock().await;
        let pick = data.rng.gen_range(0..InterventionKind::SCRIPTED.len());
        let kind = InterventionKind::SCRIPTED[pick];
        let record = InterventionRecord {
            id: Uuid::new_v4().to_string(),
            kind,
            timestamp: Utc::now(),
            duration_ms: DEFAULT_DURATION_MS,
        };

        let mut meta = Map::new();
        meta.insert("interventionId".into(), json!(record.id));
        meta.insert("kind".into(), json!(kind.as_str()));
        data.push_event(EventKind::Intervention, meta);

        data.interventions.push_front(record.clone());
        data.interventions.truncate(HISTORY_CAP);
        Ok(record)
    }

    async fn get_settings(&self) -> Result<Settings, FetchError> {
        self.call("getSettings").await?;
        Ok(self.settings.current())
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, FetchError> {
        self.call("updateSettings").await?;
        Ok(self.settings.update(&patch))
    }

    async fn record_feedback(
        &self,
        intervention_id: &str,
        response: &FeedbackResponse,
    ) -> Result<(), FetchError> {
        self.call("recordFeedback").await?;
        self.data
            .lock()
            .await
            .feedback
            .push((intervention_id.to_string(), response.clone()));
        Ok(())
    }
}
