use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::ConfigError;
use crate::intervention::{resolve, InterventionKind, InterventionSpec};

use super::clock::SessionClock;
use super::scheduler::StepScheduler;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Running,
    /// Progress is pinned at 100% during the grace delay.
    Finishing,
    Completed,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Cancelled)
    }
}

/// Passed to the completion callback so callers can tell a finished
/// session from a skipped one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Done,
    Active,
    Upcoming,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub kind: InterventionKind,
    pub display_name: &'static str,
    pub steps: &'static [&'static str],
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub progress: f64,
    pub current_step: usize,
    #[serde(skip)]
    clock: SessionClock,
    #[serde(skip)]
    scheduler: StepScheduler,
}

impl SessionState {
    pub fn begin(
        session_id: String,
        spec: InterventionSpec,
        start_at: DateTime<Utc>,
        now: Instant,
    ) -> Result<Self, ConfigError> {
        let script = resolve(spec.kind);
        if script.is_empty() {
            return Err(ConfigError::EmptyScript(spec.kind.to_string()));
        }
        let clock = SessionClock::new(now, spec.total_duration_ms)?;
        let scheduler = StepScheduler::new(spec.total_duration_ms, script.len())?;

        Ok(Self {
            session_id,
            kind: spec.kind,
            display_name: script.name,
            steps: script.steps,
            phase: SessionPhase::Running,
            started_at: start_at,
            total_duration_ms: spec.total_duration_ms,
            elapsed_ms: 0,
            remaining_ms: spec.total_duration_ms,
            progress: 0.0,
            current_step: 0,
            clock,
            scheduler,
        })
    }

    /// Samples the clock. Only a running session moves; reaching zero
    /// remaining switches it to `Finishing`. Returns true on that switch.
    pub fn observe(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }

        let reading = self.clock.reading_at(now);
        // Instants are monotonic, but keep the invariants explicit.
        if reading.elapsed_ms >= self.elapsed_ms {
            self.elapsed_ms = reading.elapsed_ms;
            self.remaining_ms = reading.remaining_ms;
        }
        self.progress = self.progress.max(reading.progress);
        self.current_step = self
            .current_step
            .max(self.scheduler.index_at(self.elapsed_ms));

        if reading.is_finished() {
            self.phase = SessionPhase::Finishing;
            true
        } else {
            false
        }
    }

    pub fn complete(&mut self) -> bool {
        if self.phase != SessionPhase::Finishing {
            return false;
        }
        self.phase = SessionPhase::Completed;
        true
    }

    /// Freezes the session where it is. Progress is left untouched.
    pub fn cancel(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = SessionPhase::Cancelled;
        true
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self.phase {
            SessionPhase::Completed => Some(SessionOutcome::Completed),
            SessionPhase::Cancelled => Some(SessionOutcome::Cancelled),
            SessionPhase::Running | SessionPhase::Finishing => None,
        }
    }

    /// Whole seconds left, rounded up for display.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    pub fn step_status(&self, index: usize) -> StepStatus {
        match index.cmp(&self.current_step) {
            std::cmp::Ordering::Less => StepStatus::Done,
            std::cmp::Ordering::Equal => StepStatus::Active,
            std::cmp::Ordering::Greater => StepStatus::Upcoming,
        }
    }

    pub fn steps_with_status(&self) -> impl Iterator<Item = (&'static str, StepStatus)> + '_ {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| (*step, self.step_status(index)))
    }
}
