//! Seam between the engine and the metadata provider.

use crate::Result;
use async_trait::async_trait;
use screenmatch_core::{MediaIdentity, MediaMetadata};

/// Resolves a media identity to normalized metadata.
///
/// Implementations are pure I/O plus normalization: callers own cache
/// population, so repeated lookups stay consistent within a TTL window.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch normalized metadata for one identity.
    ///
    /// Returns `Ok(None)` when the provider has no record for the identity;
    /// that is a valid outcome, not an error, so batch callers can skip the
    /// item and continue.
    async fn fetch(&self, identity: MediaIdentity) -> Result<Option<MediaMetadata>>;
}
