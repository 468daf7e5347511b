pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod feedback;
pub mod intervention;
pub mod session;
pub mod settings;
pub mod terminal;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use api::{DataApi, InterventionRecord, MockApi};
use config::EngineConfig;
use dashboard::Dashboard;
use events::EventBus;
use feedback::{FeedbackPrompt, FeedbackResponse};
use intervention::InterventionSpec;
use session::{SessionController, SessionOutcome};
use settings::SettingsPanel;
use terminal::{render_event, SessionFrameFilter};

pub(crate) struct AppState {
    pub(crate) api: Arc<MockApi>,
    pub(crate) events: EventBus,
    pub(crate) dashboard: Dashboard,
    pub(crate) settings: SettingsPanel,
    pub(crate) config: EngineConfig,
}

impl AppState {
    fn new(config: EngineConfig) -> Self {
        Self::with_api(Arc::new(MockApi::new()), config)
    }

    fn with_api(api: Arc<MockApi>, config: EngineConfig) -> Self {
        let events = EventBus::default();
        let shared_api: Arc<dyn DataApi> = api.clone();

        Self {
            dashboard: Dashboard::new(shared_api.clone(), events.clone(), config.dashboard),
            settings: SettingsPanel::new(shared_api, events.clone()),
            api,
            events,
            config,
        }
    }
}

/// Entry point of the terminal demo: one triggered intervention, played
/// back live, followed by the feedback prompt.
pub fn run() -> Result<()> {
    let config = EngineConfig::from_env();
    utils::logging::init(config.debug);

    info!("MindPatch starting up...");

    // Everything runs on one cooperative thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(async move {
        let state = AppState::new(config);
        let printer = spawn_printer(&state.events);
        let mut input = spawn_stdin_lines();

        let result = run_demo(&state, &mut input).await;

        state.dashboard.stop().await;
        printer.abort();
        result
    });

    // The stdin reader sits in a blocking read that never returns on its own.
    runtime.shutdown_background();
    result
}

async fn run_demo(state: &AppState, input: &mut mpsc::Receiver<String>) -> Result<()> {
    let settings = match state.settings.load().await {
        Ok(settings) => settings,
        Err(_) => state.settings.settings().await,
    };

    state.dashboard.start().await;

    println!(
        "Interventions at most every {} min.",
        settings.intervention_min_interval_minutes()
    );

    match state.dashboard.trigger_intervention().await {
        Ok(record) => run_intervention(state, &record, settings.ema_enabled, input).await?,
        // The dashboard has already surfaced the notice.
        Err(err) => warn!("no intervention to play: {err}"),
    }

    let stats = state.dashboard.stats().await;
    info!(
        "MindPatch shutting down ({} typing events, {} app switches, {} overloads seen)",
        stats.typing_events, stats.app_switches, stats.overload_detections
    );
    Ok(())
}

async fn run_intervention(
    state: &AppState,
    record: &InterventionRecord,
    ask_for_feedback: bool,
    input: &mut mpsc::Receiver<String>,
) -> Result<()> {
    println!("Type `s` and press Enter to skip.");
    let outcome = play_session(state, record, input).await?;
    info!("intervention {} ended: {outcome:?}", record.id);

    if !ask_for_feedback {
        return Ok(());
    }
    if let Some(response) = ask_feedback(input).await {
        if let Err(err) = state.api.record_feedback(&record.id, &response).await {
            warn!("failed to record feedback for {}: {err}", record.id);
            state.events.error("Failed to record feedback");
        }
    }
    Ok(())
}

async fn play_session(
    state: &AppState,
    record: &InterventionRecord,
    input: &mut mpsc::Receiver<String>,
) -> Result<SessionOutcome> {
    let (done_tx, mut done_rx) = oneshot::channel();
    let controller = SessionController::start(
        InterventionSpec::from(record),
        state.config.session,
        state.events.clone(),
        move |outcome| {
            let _ = done_tx.send(outcome);
        },
    )
    .context("failed to start intervention session")?;

    let mut input_open = true;
    loop {
        tokio::select! {
            outcome = &mut done_rx => {
                return outcome.context("session ended without reporting an outcome");
            }
            line = input.recv(), if input_open => match line {
                Some(line) if line.trim().eq_ignore_ascii_case("s") => {
                    controller.cancel().await;
                }
                Some(_) => {}
                None => input_open = false,
            },
        }
    }
}

/// `None` when the user skips, or when stdin closes.
async fn ask_feedback(input: &mut mpsc::Receiver<String>) -> Option<FeedbackResponse> {
    let mut prompt = FeedbackPrompt::new(
        |response| info!("feedback submitted: score {}", response.score),
        || info!("feedback skipped"),
    );

    println!("How helpful was that intervention?");
    println!("1 (not helpful) to 5 (very helpful), blank to skip:");
    loop {
        let Some(line) = input.recv().await else {
            prompt.skip();
            return None;
        };
        let line = line.trim();
        if line.is_empty() {
            prompt.skip();
            return None;
        }
        match line.parse::<u8>() {
            Ok(score) => match prompt.select_score(score) {
                Ok(()) => break,
                Err(err) => println!("{err}"),
            },
            Err(_) => println!("Please enter a number from 1 to 5."),
        }
    }

    println!("Additional comments (optional):");
    if let Some(note) = input.recv().await {
        prompt.set_note(note.trim());
    }

    match prompt.submit() {
        Ok(response) => Some(response),
        Err(err) => {
            warn!("feedback not submitted: {err}");
            None
        }
    }
}

fn spawn_printer(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        let mut filter = SessionFrameFilter::default();
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(text) = render_event(&event, &mut filter) {
                        println!("{text}");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("terminal fell behind; skipped {skipped} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::AppEvent;

    fn demo_state() -> AppState {
        AppState::with_api(Arc::new(MockApi::with_seed(7)), EngineConfig::default())
    }

    fn scripted_input(lines: &[&str]) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            tx.try_send(line.to_string()).unwrap();
        }
        rx
    }

    #[tokio::test]
    async fn failed_feedback_write_is_not_fatal() {
        let state = demo_state();
        let mut rx = state.events.subscribe();
        let record = state.api.trigger_intervention().await.unwrap();
        let mut input = scripted_input(&["s", "4", ""]);

        state.api.fail_next(1);
        run_intervention(&state, &record, true, &mut input).await.unwrap();
        assert!(state.api.feedback().await.is_empty());

        let notices: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                AppEvent::Notice(notice) => Some(notice.message),
                _ => None,
            })
            .collect();
        assert_eq!(notices, vec!["Failed to record feedback"]);
    }

    #[tokio::test]
    async fn feedback_is_recorded_after_a_skipped_session() {
        let state = demo_state();
        let record = state.api.trigger_intervention().await.unwrap();
        let mut input = scripted_input(&["s", "5", "calmer"]);

        run_intervention(&state, &record, true, &mut input).await.unwrap();
        let recorded = state.api.feedback().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, record.id);
        assert_eq!(recorded[0].1.score, 5);
        assert_eq!(recorded[0].1.note, "calmer");
    }

    #[tokio::test]
    async fn demo_survives_a_full_outage() {
        let state = demo_state();
        state.api.fail_next(usize::MAX);
        let mut input = scripted_input(&[]);

        run_demo(&state, &mut input).await.unwrap();
        state.dashboard.stop().await;
        assert!(state.api.feedback().await.is_empty());
    }
}
