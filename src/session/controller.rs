use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::ConfigError,
    events::{AppEvent, EventBus},
    intervention::InterventionSpec,
};

use super::{SessionOutcome, SessionPhase, SessionState};

type CompletionFn = Box<dyn FnOnce(SessionOutcome) + Send + 'static>;

struct Shared {
    state: Mutex<SessionState>,
    completion: Mutex<Option<CompletionFn>>,
    outcome_tx: watch::Sender<Option<SessionOutcome>>,
    events: EventBus,
}

impl Shared {
    async fn publish(&self) -> SessionState {
        let snapshot = self.state.lock().await.clone();
        self.events.emit(AppEvent::SessionStateChanged(snapshot.clone()));
        snapshot
    }

    /// Only the caller that won the terminal transition gets here, and the
    /// callback is taken out of its slot, so it runs at most once.
    async fn finish(&self, session_id: &str, outcome: SessionOutcome) {
        let callback = self.completion.lock().await.take();
        if let Some(callback) = callback {
            callback(outcome);
        }
        self.outcome_tx.send_replace(Some(outcome));
        self.events.emit(AppEvent::SessionFinished {
            session_id: session_id.to_string(),
            outcome,
        });
        info!("session {session_id} finished: {outcome:?}");
    }
}

/// Plays back one intervention session.
///
/// A sampler task re-reads the clock every `sample_interval` while the
/// session runs, holds the finished state for `grace_delay`, and then fires
/// the completion callback. [`cancel`](Self::cancel) ends the session at
/// once. Dropping the controller stops the sampler without firing the
/// callback.
pub struct SessionController {
    shared: Arc<Shared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancellationToken,
}

impl SessionController {
    /// Must be called from within a tokio runtime.
    pub fn start<F>(
        spec: InterventionSpec,
        config: SessionConfig,
        events: EventBus,
        on_complete: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce(SessionOutcome) + Send + 'static,
    {
        let session_id = Uuid::new_v4().to_string();
        let state = SessionState::begin(session_id.clone(), spec, Utc::now(), Instant::now())?;
        let (outcome_tx, _) = watch::channel(None);

        let shared = Arc::new(Shared {
            state: Mutex::new(state.clone()),
            completion: Mutex::new(Some(Box::new(on_complete))),
            outcome_tx,
            events,
        });

        info!(
            "session {session_id} started: {} for {}ms ({} steps)",
            state.display_name,
            state.total_duration_ms,
            state.steps.len()
        );
        shared.events.emit(AppEvent::SessionStateChanged(state));

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run_sampler(
            shared.clone(),
            config,
            cancel_token.clone(),
        ));

        Ok(Self {
            shared,
            ticker: Mutex::new(Some(handle)),
            cancel_token,
        })
    }

    pub async fn snapshot(&self) -> SessionState {
        self.shared.state.lock().await.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.shared.state.lock().await.phase
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        *self.shared.outcome_tx.borrow()
    }

    /// Resolves once the completion callback has run.
    pub async fn wait(&self) -> SessionOutcome {
        let mut rx = self.shared.outcome_tx.subscribe();
        loop {
            if let Some(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            // The sender lives in `self.shared`, so the channel cannot close
            // while `self` is borrowed.
            if rx.changed().await.is_err() {
                return SessionOutcome::Cancelled;
            }
        }
    }

    /// Skip / close. Returns false if the session had already ended.
    pub async fn cancel(&self) -> bool {
        let session_id = {
            let mut guard = self.shared.state.lock().await;
            if !guard.cancel() {
                return false;
            }
            guard.session_id.clone()
        };

        self.stop_ticker().await;
        debug!("session {session_id} cancelled by user");

        self.shared.publish().await;
        self.shared.finish(&session_id, SessionOutcome::Cancelled).await;
        true
    }

    async fn stop_ticker(&self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run_sampler(shared: Arc<Shared>, config: SessionConfig, cancel_token: CancellationToken) {
    let mut interval = time::interval(config.sample_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return,
            _ = interval.tick() => {}
        }

        let (snapshot, finished) = {
            let mut guard = shared.state.lock().await;
            if guard.phase != SessionPhase::Running {
                return;
            }
            let finished = guard.observe(Instant::now());
            (guard.clone(), finished)
        };

        shared.events.emit(AppEvent::SessionStateChanged(snapshot));

        if finished {
            break;
        }
    }

    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return,
        _ = time::sleep(config.grace_delay) => {}
    }

    let session_id = {
        let mut guard = shared.state.lock().await;
        if !guard.complete() {
            return;
        }
        guard.session_id.clone()
    };

    shared.publish().await;
    shared.finish(&session_id, SessionOutcome::Completed).await;
}
