use crate::gate::{Resolution, SessionGrants};
use crate::Result;
use async_trait::async_trait;
use snaplink_core::{ClickContext, ShortCode};

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Runs the access gate for `code` without recording anything.
    ///
    /// A correct `candidate` password grants `code` in `grants`; a wrong one
    /// bumps the failed-attempt counter there.
    async fn resolve(
        &self,
        code: &ShortCode,
        grants: &mut SessionGrants,
        candidate: Option<&str>,
    ) -> Result<Resolution>;

    /// Records one access to `code`. Returns the new click count.
    async fn record_access(&self, code: &ShortCode, context: ClickContext) -> Result<u64>;

    /// Resolves `code` and, when allowed, records the access.
    ///
    /// A failure to record is logged and otherwise ignored; only a failure
    /// to read the entity surfaces as an error.
    async fn redirect(
        &self,
        code: &ShortCode,
        grants: &mut SessionGrants,
        candidate: Option<&str>,
        context: ClickContext,
    ) -> Result<Resolution>;
}
