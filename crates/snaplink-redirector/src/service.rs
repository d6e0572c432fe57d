use std::sync::Arc;

use crate::gate::{AccessGate, Resolution, SessionGrants};
use crate::redirector::Redirector;
use crate::{RedirectorError, Result};
use async_trait::async_trait;
use snaplink_analytics::ClickRecorder;
use snaplink_core::{ClickContext, Clock, Repository, ShortCode, SystemClock};
use tracing::{debug, trace, warn};

/// Service for handling URL redirects.
///
/// Reads the entity, runs it through the [`AccessGate`] and records a click
/// for every allowed redirect.
pub struct RedirectorService<R> {
    repository: Arc<R>,
    gate: AccessGate,
    recorder: ClickRecorder<R>,
}

impl<R> Clone for RedirectorService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            gate: self.gate.clone(),
            recorder: self.recorder.clone(),
        }
    }
}

impl<R: Repository> RedirectorService<R> {
    /// Creates a new RedirectorService reading wall-clock time.
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_clock(repository, Arc::new(SystemClock))
    }

    /// Creates a service whose gate and recorder share `clock`.
    pub fn with_clock(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate: AccessGate::new(Arc::clone(&clock)),
            recorder: ClickRecorder::builder()
                .repository(Arc::clone(&repository))
                .clock(clock)
                .build(),
            repository,
        }
    }
}

#[async_trait]
impl<R: Repository> Redirector for RedirectorService<R> {
    async fn resolve(
        &self,
        code: &ShortCode,
        grants: &mut SessionGrants,
        candidate: Option<&str>,
    ) -> Result<Resolution> {
        trace!(code = %code, "resolving short code");

        let entity = self.repository.get(code).await?;
        let verifies_password = candidate.is_some()
            && entity
                .as_ref()
                .is_some_and(|e| e.is_protected() && !grants.is_granted(&e.code));

        let resolution = if verifies_password {
            // Argon2 verification is slow, keep it off the async workers
            let gate = self.gate.clone();
            let candidate = candidate.map(str::to_owned);
            let mut session = grants.clone();
            let (resolution, session) = tokio::task::spawn_blocking(move || {
                let resolution = gate.check(entity.as_ref(), &mut session, candidate.as_deref());
                (resolution, session)
            })
            .await
            .map_err(|e| RedirectorError::Verification(e.to_string()))?;
            *grants = session;
            resolution
        } else {
            self.gate.check(entity.as_ref(), grants, candidate)
        };

        debug!(code = %code, outcome = resolution.reason(), "resolved short code");
        Ok(resolution)
    }

    async fn record_access(&self, code: &ShortCode, context: ClickContext) -> Result<u64> {
        Ok(self.recorder.record(code, context).await?)
    }

    async fn redirect(
        &self,
        code: &ShortCode,
        grants: &mut SessionGrants,
        candidate: Option<&str>,
        context: ClickContext,
    ) -> Result<Resolution> {
        let resolution = self.resolve(code, grants, candidate).await?;

        if resolution.is_allowed() {
            if let Err(e) = self.record_access(code, context).await {
                warn!(code = %code, error = %e, "failed to record click, redirecting anyway");
            }
        }

        Ok(resolution)
    }
}
