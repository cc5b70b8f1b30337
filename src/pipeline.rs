use anyhow::Result;
use async_trait::async_trait;

use crate::github::GithubClient;
use crate::users::IdentityMap;

/// The four-stage lifecycle every migrated entity kind goes through:
/// fetch from the source, transform in memory, copy to the destination,
/// and (for kinds that leave a marker) clean up the source.
///
/// Stages run strictly in order within a run. Failures inside a stage are
/// per-item: a unit that cannot be copied is logged and dropped while the
/// rest of the batch continues. Only client initialization is fatal, and
/// that happens before any pipeline is constructed.
#[async_trait]
pub trait Pipeline {
    fn kind(&self) -> &'static str;

    /// Retrieve candidate items from the source. Items already carrying a
    /// migrated marker are excluded here, so re-runs do not duplicate work.
    async fn fetch(&mut self, source: &GithubClient) -> Result<()>;

    /// Filter and rewrite fetched items into migration units. The identity
    /// map is lent read-only by the orchestrator; kinds without text fields
    /// ignore it.
    fn transform(&mut self, identities: &IdentityMap);

    /// Create the units on the destination. An already-existing entity is
    /// a logged skip, never an abort.
    async fn copy(&mut self, destination: &GithubClient) -> Result<()>;

    /// Write the migrated marker back onto source items whose copy
    /// succeeded. Kinds without a marker keep the default no-op.
    async fn cleanup(&mut self, _source: &GithubClient) -> Result<()> {
        Ok(())
    }
}
