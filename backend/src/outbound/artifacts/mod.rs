//! Durable storage for rendered certificate artifacts.

mod filesystem_artifact_store;

pub use filesystem_artifact_store::FilesystemArtifactStore;
