//! Driven port persisting rendered artifacts.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{ArtifactKey, RenderedArtifact};

define_port_error! {
    /// Errors raised while storing artifacts.
    pub enum ArtifactStoreError {
        /// The key cannot be mapped to a storage location.
        InvalidKey { key: String } => "artifact key is not storable: {key}",
        /// Writing the artifact failed.
        Write { message: String } => "artifact write failed: {message}",
    }
}

/// Port for durable artifact storage addressed by key.
///
/// `put` must replace any existing object under the key atomically, so
/// concurrent writers of identical content leave one complete object.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the artifact and return its public URL.
    async fn put(
        &self,
        key: &ArtifactKey,
        artifact: &RenderedArtifact,
    ) -> Result<String, ArtifactStoreError>;
}
