//! Click recording and on-demand analytics over the bounded click history.

pub mod aggregator;
pub mod error;
pub mod recorder;
pub mod user_agent;

pub use aggregator::{summarize_at, AnalyticsAggregator, AnalyticsSummary, TimeDistribution};
pub use error::{RecordError, Result};
pub use recorder::ClickRecorder;
pub use user_agent::classify;
