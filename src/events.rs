use serde::Serialize;
use tokio::sync::broadcast;

use crate::dashboard::DashboardSnapshot;
use crate::session::{SessionOutcome, SessionState};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient, dismissible message for the user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppEvent {
    SessionStateChanged(SessionState),
    #[serde(rename_all = "camelCase")]
    SessionFinished {
        session_id: String,
        outcome: SessionOutcome,
    },
    DashboardUpdated(DashboardSnapshot),
    Notice(Notice),
}

/// Fan-out of UI events. Emitting never blocks and never fails; events
/// sent with no subscriber attached are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(AppEvent::Notice(Notice {
            level,
            message: message.into(),
        }));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message);
    }
}
