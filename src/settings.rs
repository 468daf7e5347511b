use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::DataApi;
use crate::error::FetchError;
use crate::events::EventBus;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Read by the overload detector, which lives outside this crate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSensitivity {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub telemetry_enabled: bool,
    pub monitoring_enabled: bool,
    pub detection_sensitivity: DetectionSensitivity,
    pub intervention_enabled: bool,
    pub ema_enabled: bool,
    pub intervention_min_interval_ms: u64,
    pub calendar_enabled: bool,
    pub privacy_mode: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry_enabled: false,
            monitoring_enabled: true,
            detection_sensitivity: DetectionSensitivity::Medium,
            intervention_enabled: true,
            ema_enabled: true,
            intervention_min_interval_ms: 900_000,
            calendar_enabled: false,
            privacy_mode: "strict".into(),
        }
    }
}

impl Settings {
    pub fn intervention_min_interval_minutes(&self) -> u64 {
        (self.intervention_min_interval_ms as f64 / 60_000.0).round() as u64
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(value) = patch.telemetry_enabled {
            self.telemetry_enabled = value;
        }
        if let Some(value) = patch.monitoring_enabled {
            self.monitoring_enabled = value;
        }
        if let Some(value) = patch.detection_sensitivity {
            self.detection_sensitivity = value;
        }
        if let Some(value) = patch.intervention_enabled {
            self.intervention_enabled = value;
        }
        if let Some(value) = patch.ema_enabled {
            self.ema_enabled = value;
        }
        if let Some(value) = patch.intervention_min_interval_ms {
            self.intervention_min_interval_ms = value;
        }
        if let Some(value) = patch.calendar_enabled {
            self.calendar_enabled = value;
        }
    }
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_sensitivity: Option<DetectionSensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention_min_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_enabled: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// In-memory settings owned by the data collaborator.
#[derive(Debug, Default)]
pub struct SettingsStore {
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            data: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> Settings {
        self.read().clone()
    }

    pub fn update(&self, patch: &SettingsPatch) -> Settings {
        let mut guard = self.write();
        guard.apply(patch);
        guard.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// View-side copy of the settings, kept in sync with the collaborator.
pub struct SettingsPanel {
    api: Arc<dyn DataApi>,
    events: EventBus,
    settings: Mutex<Settings>,
    loaded: Mutex<bool>,
}

impl SettingsPanel {
    pub fn new(api: Arc<dyn DataApi>, events: EventBus) -> Self {
        Self {
            api,
            events,
            settings: Mutex::new(Settings::default()),
            loaded: Mutex::new(false),
        }
    }

    pub async fn settings(&self) -> Settings {
        self.settings.lock().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        *self.loaded.lock().await
    }

    /// On failure the defaults stay in place and the panel still counts as
    /// loaded.
    pub async fn load(&self) -> Result<Settings, FetchError> {
        let result = self.api.get_settings().await;
        *self.loaded.lock().await = true;
        match result {
            Ok(settings) => {
                *self.settings.lock().await = settings.clone();
                Ok(settings)
            }
            Err(err) => {
                log_error!("failed to load settings: {err}");
                self.events.error("Failed to load settings");
                Err(err)
            }
        }
    }

    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings, FetchError> {
        match self.api.update_settings(patch.clone()).await {
            Ok(_) => {
                let mut guard = self.settings.lock().await;
                guard.apply(&patch);
                log_info!("settings updated: {patch:?}");
                self.events.success("Setting updated (demo mode)");
                Ok(guard.clone())
            }
            Err(err) => {
                log_error!("failed to update settings: {err}");
                self.events.error("Failed to update setting");
                Err(err)
            }
        }
    }
}
