use std::time::Duration;

use log::warn;

const DEFAULT_SAMPLE_MS: u64 = 100;
const MIN_SAMPLE_MS: u64 = 10;
/// Slower sampling would make the progress display visibly lag.
const MAX_SAMPLE_MS: u64 = 250;
const DEFAULT_GRACE_MS: u64 = 1_000;
const DEFAULT_REFRESH_SECS: u64 = 5;
const DEFAULT_EVENTS_LIMIT: usize = 10;
const DEFAULT_INTERVENTIONS_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub sample_interval: Duration,
    pub grace_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_MS),
            grace_delay: Duration::from_millis(DEFAULT_GRACE_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConfig {
    pub refresh_interval: Duration,
    pub events_limit: usize,
    pub interventions_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            events_limit: DEFAULT_EVENTS_LIMIT,
            interventions_limit: DEFAULT_INTERVENTIONS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub dashboard: DashboardConfig,
    pub debug: bool,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("MINDPATCH_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let sample_ms = parse_or(&lookup, "MINDPATCH_SAMPLE_MS", DEFAULT_SAMPLE_MS)
            .clamp(MIN_SAMPLE_MS, MAX_SAMPLE_MS);
        let grace_ms = parse_or(&lookup, "MINDPATCH_GRACE_MS", DEFAULT_GRACE_MS);
        let refresh_secs = parse_or(&lookup, "MINDPATCH_REFRESH_SECS", DEFAULT_REFRESH_SECS).max(1);
        let events_limit = parse_or(&lookup, "MINDPATCH_EVENTS_LIMIT", DEFAULT_EVENTS_LIMIT).max(1);
        let interventions_limit = parse_or(
            &lookup,
            "MINDPATCH_INTERVENTIONS_LIMIT",
            DEFAULT_INTERVENTIONS_LIMIT,
        )
        .max(1);

        Self {
            session: SessionConfig {
                sample_interval: Duration::from_millis(sample_ms),
                grace_delay: Duration::from_millis(grace_ms),
            },
            dashboard: DashboardConfig {
                refresh_interval: Duration::from_secs(refresh_secs),
                events_limit,
                interventions_limit,
            },
            debug,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {key}={raw:?}; using default");
            default
        }),
    }
}
