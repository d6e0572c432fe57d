use crate::error::{RecordError, Result};
use snaplink_core::{ClickContext, ClickEvent, Clock, Repository, ShortCode, SystemClock};
use std::sync::Arc;
use tracing::trace;
use typed_builder::TypedBuilder;

/// Appends click events to an entity's bounded history.
///
/// Each call is a single atomic increment-append-trim in the repository, so
/// concurrent recorders never lose an update.
#[derive(TypedBuilder)]
pub struct ClickRecorder<R> {
    repository: Arc<R>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
}

impl<R> Clone for ClickRecorder<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R: Repository> ClickRecorder<R> {
    /// Records one access stamped with the current time.
    ///
    /// Returns the new click count.
    pub async fn record(&self, code: &ShortCode, context: ClickContext) -> Result<u64> {
        let event = ClickEvent::new(self.clock.now(), context);

        let count = self
            .repository
            .record_click(code, event)
            .await?
            .ok_or_else(|| RecordError::NotFound(code.to_string()))?;

        trace!(code = %code, count, "click recorded");
        Ok(count)
    }
}
