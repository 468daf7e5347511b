use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use chrono::Utc;
use tokio::{
    sync::Mutex,
    task::{JoinHandle, JoinSet},
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{DataApi, InterventionRecord, Stats},
    config::DashboardConfig,
    error::FetchError,
    events::{AppEvent, EventBus},
};

use super::DashboardSnapshot;

// Set to false to silence the refresh loop
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Default)]
struct View {
    snapshot: Option<DashboardSnapshot>,
    applied_cycle: u64,
}

struct Inner {
    api: Arc<dyn DataApi>,
    events: EventBus,
    config: DashboardConfig,
    view: Mutex<View>,
    issued_cycles: AtomicU64,
    monitoring: AtomicBool,
    demo_notice: AtomicBool,
}

impl Inner {
    /// Fetches stats, events and interventions concurrently and applies them
    /// together. A cycle that finishes after a newer one has been applied is
    /// dropped, and so is its failure notice.
    async fn refresh(&self) -> Result<DashboardSnapshot, FetchError> {
        let cycle = self.issued_cycles.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = tokio::try_join!(
            self.api.get_stats(),
            self.api.get_events(self.config.events_limit),
            self.api
                .get_recent_interventions(self.config.interventions_limit),
        );

        let (stats, events, interventions) = match fetched {
            Ok(parts) => parts,
            Err(err) => {
                let applied = self.view.lock().await.applied_cycle;
                if cycle < applied {
                    log_debug!("refresh {cycle} failed after refresh {applied} was applied: {err}");
                } else {
                    log_error!("dashboard refresh {cycle} failed: {err}");
                    self.events.error("Failed to load dashboard data");
                }
                return Err(err);
            }
        };

        let snapshot = DashboardSnapshot {
            stats,
            events,
            interventions,
            fetched_at: Utc::now(),
        };

        {
            let mut view = self.view.lock().await;
            if cycle < view.applied_cycle {
                log_debug!(
                    "dropping refresh {cycle}; refresh {} already applied",
                    view.applied_cycle
                );
                return Ok(snapshot);
            }
            view.snapshot = Some(snapshot.clone());
            view.applied_cycle = cycle;
        }

        self.events.emit(AppEvent::DashboardUpdated(snapshot.clone()));
        Ok(snapshot)
    }
}

/// Periodically pulls a [`DashboardSnapshot`] from the data collaborator.
///
/// The loop runs each cycle as its own child task, so a stalled fetch only
/// holds back its own cycle. `stop` (or dropping the dashboard) releases
/// the timer and any cycle still in flight.
pub struct Dashboard {
    inner: Arc<Inner>,
    ticker: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
    lifetime: CancellationToken,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DataApi>, events: EventBus, config: DashboardConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                events,
                config,
                view: Mutex::new(View::default()),
                issued_cycles: AtomicU64::new(0),
                monitoring: AtomicBool::new(true),
                demo_notice: AtomicBool::new(true),
            }),
            ticker: Mutex::new(None),
            lifetime: CancellationToken::new(),
        }
    }

    pub async fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.inner.view.lock().await.snapshot.clone()
    }

    /// Zeroes until the first successful refresh.
    pub async fn stats(&self) -> Stats {
        self.snapshot()
            .await
            .map(|snapshot| snapshot.stats)
            .unwrap_or_default()
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    /// Starts the periodic loop; the first refresh is issued immediately.
    /// Does nothing if the loop is already running.
    pub async fn start(&self) {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            return;
        }

        let token = self.lifetime.child_token();
        let handle = tokio::spawn(refresh_loop(self.inner.clone(), token.clone()));
        *ticker = Some((handle, token));
        log_info!(
            "dashboard refresh loop started (every {:?})",
            self.inner.config.refresh_interval
        );
    }

    pub async fn stop(&self) {
        let Some((handle, token)) = self.ticker.lock().await.take() else {
            return;
        };
        token.cancel();
        if let Err(err) = handle.await {
            if !err.is_cancelled() {
                log_error!("dashboard refresh loop failed to join: {err}");
            }
        }
    }

    /// One refresh outside the periodic schedule.
    pub async fn refresh_now(&self) -> Result<DashboardSnapshot, FetchError> {
        self.inner.refresh().await
    }

    /// Fire-and-forget trigger. On success an out-of-band refresh is
    /// started right away instead of waiting for the next tick.
    pub async fn trigger_intervention(&self) -> Result<InterventionRecord, FetchError> {
        match self.inner.api.trigger_intervention().await {
            Ok(record) => {
                log_info!("intervention {} triggered ({})", record.id, record.kind);
                self.inner.events.success("Intervention triggered (demo mode)");

                let inner = self.inner.clone();
                let lifetime = self.lifetime.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = lifetime.cancelled() => {}
                        _ = inner.refresh() => {}
                    }
                });
                Ok(record)
            }
            Err(err) => {
                log_error!("failed to trigger intervention: {err}");
                self.inner.events.error("Failed to trigger intervention");
                Err(err)
            }
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner.monitoring.load(Ordering::SeqCst)
    }

    /// Local display state only; nothing is sent to the collaborator.
    pub fn toggle_monitoring(&self) -> bool {
        let was_monitoring = self.inner.monitoring.fetch_xor(true, Ordering::SeqCst);
        self.inner.events.success(if was_monitoring {
            "Monitoring paused (demo)"
        } else {
            "Monitoring resumed (demo)"
        });
        !was_monitoring
    }

    pub fn demo_notice_visible(&self) -> bool {
        self.inner.demo_notice.load(Ordering::SeqCst)
    }

    pub fn dismiss_demo_notice(&self) {
        self.inner.demo_notice.store(false, Ordering::SeqCst);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.lifetime.cancel();
        if let Some((handle, _)) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

async fn refresh_loop(inner: Arc<Inner>, cancel_token: CancellationToken) {
    let mut interval = time::interval(inner.config.refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("dashboard refresh loop shutting down");
                break;
            }
            _ = interval.tick() => {
                let inner = inner.clone();
                cycles.spawn(async move {
                    // Failures are already surfaced as notices.
                    let _ = inner.refresh().await;
                });
            }
            Some(_) = cycles.join_next(), if !cycles.is_empty() => {}
        }
    }

    cycles.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EventRecord, MockApi};
    use crate::events::NoticeLevel;
    use crate::settings::{Settings, SettingsPatch};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn dashboard(api: Arc<dyn DataApi>) -> (Dashboard, broadcast::Receiver<AppEvent>) {
        let events = EventBus::default();
        let rx = events.subscribe();
        (Dashboard::new(api, events, DashboardConfig::default()), rx)
    }

    fn drain_updates(rx: &mut broadcast::Receiver<AppEvent>) -> Vec<DashboardSnapshot> {
        let mut updates = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::DashboardUpdated(snapshot) = event {
                updates.push(snapshot);
            }
        }
        updates
    }

    /// The first stats call stalls for `stall`, then fails if `stall_fails`
    /// is set; later calls answer at once. Each call reports its own
    /// sequence number as the typing count.
    struct StallingApi {
        inner: MockApi,
        stall: Duration,
        stall_fails: bool,
        interventions_fail: AtomicBool,
        stats_calls: AtomicUsize,
    }

    impl StallingApi {
        fn new(seed: u64, stall: Duration) -> Self {
            Self {
                inner: MockApi::with_seed(seed),
                stall,
                stall_fails: false,
                interventions_fail: AtomicBool::new(false),
                stats_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DataApi for StallingApi {
        async fn get_stats(&self) -> Result<Stats, FetchError> {
            let call = self.stats_calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                time::sleep(self.stall).await;
                if self.stall_fails {
                    return Err(FetchError::unavailable("getStats", "timed out"));
                }
            }
            Ok(Stats {
                typing_events: call as u64 + 1,
                ..Stats::default()
            })
        }

        async fn get_events(&self, limit: usize) -> Result<Vec<EventRecord>, FetchError> {
            self.inner.get_events(limit).await
        }

        async fn get_recent_interventions(
            &self,
            limit: usize,
        ) -> Result<Vec<InterventionRecord>, FetchError> {
            if self.interventions_fail.load(Ordering::SeqCst) {
                return Err(FetchError::unavailable("getRecentInterventions", "down"));
            }
            self.inner.get_recent_interventions(limit).await
        }

        async fn trigger_intervention(&self) -> Result<InterventionRecord, FetchError> {
            self.inner.trigger_intervention().await
        }

        async fn get_settings(&self) -> Result<Settings, FetchError> {
            self.inner.get_settings().await
        }

        async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, FetchError> {
            self.inner.update_settings(patch).await
        }
    }

    #[tokio::test]
    async fn refresh_applies_all_three_parts() {
        let (dashboard, mut rx) = dashboard(Arc::new(MockApi::with_seed(11)));
        assert!(dashboard.snapshot().await.is_none());
        assert_eq!(dashboard.stats().await, Stats::default());

        let snapshot = dashboard.refresh_now().await.unwrap();
        assert_eq!(snapshot.events.len(), 10);
        assert!(snapshot.interventions.is_empty());
        assert!(snapshot.stats.typing_events + snapshot.stats.app_switches > 0);
        assert_eq!(dashboard.snapshot().await, Some(snapshot.clone()));
        assert_eq!(drain_updates(&mut rx), vec![snapshot]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let api = Arc::new(MockApi::with_seed(12));
        let (dashboard, mut rx) = dashboard(api.clone());
        let first = dashboard.refresh_now().await.unwrap();
        drain_updates(&mut rx);

        api.fail_next(1);
        assert!(dashboard.refresh_now().await.is_err());
        assert_eq!(dashboard.snapshot().await, Some(first));

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Notice(notice) => {
                    assert_eq!(notice.level, NoticeLevel::Error);
                    assert_eq!(notice.message, "Failed to load dashboard data");
                    saw_error = true;
                }
                AppEvent::DashboardUpdated(_) => panic!("partial update published"),
                _ => {}
            }
        }
        assert!(saw_error);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_refreshes_periodically_until_stopped() {
        let (dashboard, mut rx) = dashboard(Arc::new(MockApi::with_seed(13)));
        dashboard.start().await;
        dashboard.start().await;
        assert!(dashboard.is_running().await);

        time::sleep(Duration::from_millis(12_000)).await;
        assert_eq!(drain_updates(&mut rx).len(), 3);

        dashboard.stop().await;
        assert!(!dashboard.is_running().await);
        time::sleep(Duration::from_secs(30)).await;
        assert!(drain_updates(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cycle_does_not_block_the_next_tick() {
        let api = Arc::new(StallingApi::new(14, Duration::from_secs(60)));
        let (dashboard, _rx) = dashboard(api);
        dashboard.start().await;

        time::sleep(Duration::from_millis(6_000)).await;
        assert_eq!(dashboard.stats().await.typing_events, 2);

        // The stalled first cycle lands after newer ones and is discarded.
        time::sleep(Duration::from_secs(60)).await;
        assert!(dashboard.stats().await.typing_events > 2);
        assert_ne!(dashboard.stats().await.typing_events, 1);
        dashboard.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn late_failure_of_a_superseded_cycle_stays_quiet() {
        let api = Arc::new(StallingApi {
            stall_fails: true,
            ..StallingApi::new(18, Duration::from_secs(12))
        });
        let (dashboard, mut rx) = dashboard(api);
        dashboard.start().await;

        time::sleep(Duration::from_secs(13)).await;
        let mut updates = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::DashboardUpdated(_) => updates += 1,
                AppEvent::Notice(notice) => panic!("unexpected notice {:?}", notice.message),
                _ => {}
            }
        }
        assert_eq!(updates, 2);
        assert_eq!(dashboard.stats().await.typing_events, 3);
        dashboard.stop().await;
    }

    #[tokio::test]
    async fn interventions_failure_applies_nothing() {
        let api = Arc::new(StallingApi::new(19, Duration::ZERO));
        let (dashboard, mut rx) = dashboard(api.clone());
        let first = dashboard.refresh_now().await.unwrap();
        drain_updates(&mut rx);

        api.interventions_fail.store(true, Ordering::SeqCst);
        assert!(dashboard.refresh_now().await.is_err());
        assert_eq!(dashboard.snapshot().await, Some(first));
        assert!(drain_updates(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_refreshes_out_of_band() {
        let (dashboard, mut rx) = dashboard(Arc::new(MockApi::with_seed(15)));
        let record = dashboard.trigger_intervention().await.unwrap();

        let mut saw_success = false;
        loop {
            match rx.recv().await.unwrap() {
                AppEvent::Notice(notice) => {
                    assert_eq!(notice.message, "Intervention triggered (demo mode)");
                    saw_success = true;
                }
                AppEvent::DashboardUpdated(snapshot) => {
                    assert_eq!(snapshot.interventions[0], record);
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_success);
    }

    #[tokio::test]
    async fn failed_trigger_surfaces_a_notice() {
        let api = Arc::new(MockApi::with_seed(16));
        let (dashboard, mut rx) = dashboard(api.clone());
        api.fail_next(1);
        assert!(dashboard.trigger_intervention().await.is_err());
        match rx.recv().await.unwrap() {
            AppEvent::Notice(notice) => {
                assert_eq!(notice.message, "Failed to trigger intervention")
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn monitoring_toggle_and_demo_notice() {
        let (dashboard, mut rx) = dashboard(Arc::new(MockApi::with_seed(17)));
        assert!(dashboard.is_monitoring());
        assert!(!dashboard.toggle_monitoring());
        assert!(dashboard.toggle_monitoring());

        let messages: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                AppEvent::Notice(notice) => Some(notice.message),
                _ => None,
            })
            .collect();
        assert_eq!(
            messages,
            vec!["Monitoring paused (demo)", "Monitoring resumed (demo)"]
        );

        assert!(dashboard.demo_notice_visible());
        dashboard.dismiss_demo_notice();
        assert!(!dashboard.demo_notice_visible());
    }
}
