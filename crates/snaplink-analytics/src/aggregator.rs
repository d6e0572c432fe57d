use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use snaplink_core::{ClickEvent, Clock, SystemClock, UrlEntity};
use std::collections::BTreeMap;
use std::sync::Arc;

const HOUR: SignedDuration = SignedDuration::from_hours(1);
const DAY: SignedDuration = SignedDuration::from_hours(24);

/// History entries that fall inside the trailing windows ending at "now".
///
/// `total` mirrors the lifetime click count, not the history length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeDistribution {
    pub last_24_hours: u64,
    pub last_7_days: u64,
    pub last_30_days: u64,
    pub total: u64,
}

/// Summary statistics derived from one entity's click state.
///
/// Frequency tables cover only the retained history, so after truncation
/// their sums can be lower than `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: u64,
    pub browsers: BTreeMap<String, u64>,
    pub os: BTreeMap<String, u64>,
    pub devices: BTreeMap<String, u64>,
    pub referrers: BTreeMap<String, u64>,
    pub time_distribution: TimeDistribution,
    /// Clicks per hour since creation; 0 for links younger than an hour.
    pub click_rate: f64,
}

/// Computes summaries against an injected clock.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    clock: Arc<dyn Clock>,
}

impl AnalyticsAggregator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Summarizes `entity` as of the clock's current reading.
    pub fn summarize(&self, entity: &UrlEntity) -> AnalyticsSummary {
        summarize_at(entity, self.clock.now())
    }
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// Pure summary of `entity` as of `now`.
pub fn summarize_at(entity: &UrlEntity, now: Timestamp) -> AnalyticsSummary {
    let since_24h = window_start(now, DAY);
    let since_7d = window_start(now, DAY * 7);
    let since_30d = window_start(now, DAY * 30);

    let mut summary = AnalyticsSummary {
        total: entity.click_count,
        time_distribution: TimeDistribution {
            total: entity.click_count,
            ..Default::default()
        },
        click_rate: click_rate(entity, now),
        ..Default::default()
    };

    for event in &entity.click_history {
        tally(&mut summary, event);

        let window = &mut summary.time_distribution;
        if event.timestamp >= since_24h {
            window.last_24_hours += 1;
        }
        if event.timestamp >= since_7d {
            window.last_7_days += 1;
        }
        if event.timestamp >= since_30d {
            window.last_30_days += 1;
        }
    }

    summary
}

// blank fields carry no information and are left out of the tables
fn tally(summary: &mut AnalyticsSummary, event: &ClickEvent) {
    for (table, key) in [
        (&mut summary.browsers, &event.browser),
        (&mut summary.os, &event.os),
        (&mut summary.devices, &event.device),
        (&mut summary.referrers, &event.referrer),
    ] {
        if !key.is_empty() {
            *table.entry(key.clone()).or_default() += 1;
        }
    }
}

fn window_start(now: Timestamp, width: SignedDuration) -> Timestamp {
    now.checked_sub(width).unwrap_or(Timestamp::MIN)
}

fn click_rate(entity: &UrlEntity, now: Timestamp) -> f64 {
    let age = now.duration_since(entity.created_at);
    if age < HOUR {
        return 0.0;
    }
    entity.click_count as f64 / (age.as_secs_f64() / HOUR.as_secs_f64())
}
