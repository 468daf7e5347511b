//! Plain-text rendering for the terminal demo host.

use crate::dashboard::DashboardSnapshot;
use crate::events::{AppEvent, Notice, NoticeLevel};
use crate::session::{SessionPhase, SessionState, StepStatus};

const BAR_WIDTH: usize = 24;

pub fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn render_session(state: &SessionState) -> String {
    let mut out = format!(
        "{} {} {:>3}%  {}s remaining\n",
        state.display_name,
        progress_bar(state.progress),
        (state.progress * 100.0).round() as u32,
        state.remaining_secs()
    );
    for (index, (step, status)) in state.steps_with_status().enumerate() {
        let marker = match status {
            StepStatus::Done => "  ✓".to_string(),
            StepStatus::Active => format!("> {}", index + 1),
            StepStatus::Upcoming => format!("  {}", index + 1),
        };
        out.push_str(&format!("  {marker}. {step}\n"));
    }
    if state.phase == SessionPhase::Finishing {
        out.push_str("  Done. Nice work.\n");
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let stats = &snapshot.stats;
    let mut out = format!(
        "typing events: {}  app switches: {}  overload detected: {}\n",
        stats.typing_events, stats.app_switches, stats.overload_detections
    );

    out.push_str("recent interventions:\n");
    if snapshot.interventions.is_empty() {
        out.push_str("  No interventions yet today\n");
    }
    for intervention in &snapshot.interventions {
        out.push_str(&format!(
            "  {:<12} {}\n",
            intervention.kind,
            intervention.timestamp.format("%H:%M:%S")
        ));
    }

    out.push_str("recent activity:\n");
    if snapshot.events.is_empty() {
        out.push_str("  No activity detected yet\n");
    }
    for event in &snapshot.events {
        let kind = serde_json::to_value(event.kind)
            .ok()
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {:<13} {:<10} {}\n",
            kind,
            event.app().unwrap_or(""),
            event.timestamp.format("%H:%M:%S")
        ));
    }
    out
}

/// Session frames are only worth printing when the step or the displayed
/// second changes.
#[derive(Default)]
pub struct SessionFrameFilter {
    last: Option<(String, usize, u64, SessionPhase)>,
}

impl SessionFrameFilter {
    pub fn should_render(&mut self, state: &SessionState) -> bool {
        let key = (
            state.session_id.clone(),
            state.current_step,
            state.remaining_secs(),
            state.phase,
        );
        if self.last.as_ref() == Some(&key) {
            return false;
        }
        self.last = Some(key);
        true
    }
}

pub fn render_event(event: &AppEvent, filter: &mut SessionFrameFilter) -> Option<String> {
    match event {
        AppEvent::SessionStateChanged(state) => {
            if state.phase.is_terminal() || !filter.should_render(state) {
                None
            } else {
                Some(render_session(state))
            }
        }
        AppEvent::SessionFinished { outcome, .. } => Some(format!("session finished: {outcome:?}")),
        AppEvent::DashboardUpdated(snapshot) => Some(render_dashboard(snapshot)),
        AppEvent::Notice(notice) => Some(render_notice(notice)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::{InterventionKind, InterventionSpec};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[test]
    fn progress_bar_bounds() {
        assert_eq!(progress_bar(0.0), format!("[{}]", "-".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(1.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(2.0), progress_bar(1.0));
    }

    #[test]
    fn session_render_marks_steps() {
        let start = Instant::now();
        let mut state = SessionState::begin(
            "s".into(),
            InterventionSpec::new(InterventionKind::Posture, 40_000),
            Utc::now(),
            start,
        )
        .unwrap();
        state.observe(start + Duration::from_secs(15));

        let text = render_session(&state);
        assert!(text.starts_with("Posture Check"));
        assert!(text.contains("25s remaining"));
        assert!(text.contains("  ✓. Sit up straight in your chair"));
        assert!(text.contains("> 2. Roll shoulders back and down"));
        assert!(text.contains("  3. Place feet flat on the floor"));
    }

    #[test]
    fn frame_filter_skips_duplicate_frames() {
        let start = Instant::now();
        let mut state = SessionState::begin(
            "s".into(),
            InterventionSpec::new(InterventionKind::Other, 3_000),
            Utc::now(),
            start,
        )
        .unwrap();
        let mut filter = SessionFrameFilter::default();
        assert!(filter.should_render(&state));
        state.observe(start + Duration::from_millis(100));
        assert!(!filter.should_render(&state));
        state.observe(start + Duration::from_millis(1_100));
        assert!(filter.should_render(&state));
    }
}
