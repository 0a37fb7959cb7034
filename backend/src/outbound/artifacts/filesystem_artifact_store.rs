//! Filesystem-backed artifact store.
//!
//! Artifacts live under a capability-scoped root directory. Each `put` writes
//! a hidden temporary file next to the target and renames it into place, so
//! readers never observe a partial certificate and concurrent writers of the
//! same key leave one complete file.

use std::io::{self, Write};
use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{ArtifactStore, ArtifactStoreError};
use crate::domain::{ArtifactKey, RenderedArtifact};

/// Stores artifacts as files and serves them from a public base URL.
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStore {
    root: Arc<Dir>,
    public_base_url: String,
}

impl FilesystemArtifactStore {
    /// Open (creating if needed) `root` and publish files under
    /// `public_base_url`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be created
    /// or opened.
    pub fn open(root: impl AsRef<Path>, public_base_url: impl Into<String>) -> io::Result<Self> {
        let authority = ambient_authority();
        Dir::create_ambient_dir_all(root.as_ref(), authority)?;
        let dir = Dir::open_ambient_dir(root.as_ref(), authority)?;
        Ok(Self::from_dir(dir, public_base_url))
    }

    /// Wrap an already opened directory.
    pub fn from_dir(root: Dir, public_base_url: impl Into<String>) -> Self {
        Self {
            root: Arc::new(root),
            public_base_url: public_base_url.into(),
        }
    }

    fn public_url(&self, key: &ArtifactKey) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

/// Split a key into its parent directory and file name.
///
/// Only plain relative components are accepted.
fn split_key(key: &str) -> Option<(Option<&Path>, &str)> {
    let path = Path::new(key);
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return None;
    }
    let file_name = path.file_name()?.to_str()?;
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    Some((parent, file_name))
}

/// Hidden sibling name unique to one write.
fn temp_name(file_name: &str) -> String {
    format!(".{file_name}.tmp-{}", Uuid::new_v4().simple())
}

fn write_atomic(dir: &Dir, file_name: &str, contents: &[u8]) -> io::Result<()> {
    let tmp_name = temp_name(file_name);

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let written = dir.open_with(&tmp_name, &options).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    let renamed = written.and_then(|()| dir.rename(&tmp_name, dir, file_name));
    if let Err(err) = renamed {
        if let Err(cleanup) = dir.remove_file(&tmp_name) {
            debug!(%tmp_name, error = %cleanup, "temporary artifact not removed");
        }
        return Err(err);
    }

    if let Err(err) = dir.open(".").and_then(|handle| handle.sync_all()) {
        debug!(%file_name, error = %err, "artifact directory sync skipped");
    }
    Ok(())
}

fn store_blocking(root: &Dir, key: &ArtifactKey, contents: &[u8]) -> Result<(), ArtifactStoreError> {
    let (parent, file_name) =
        split_key(key.as_str()).ok_or_else(|| ArtifactStoreError::invalid_key(key.as_str()))?;
    let write_error = |err: io::Error| ArtifactStoreError::write(format!("{key}: {err}"));

    match parent {
        Some(parent) => {
            root.create_dir_all(parent).map_err(write_error)?;
            let dir = root.open_dir(parent).map_err(write_error)?;
            write_atomic(&dir, file_name, contents).map_err(write_error)
        }
        None => write_atomic(root, file_name, contents).map_err(write_error),
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn put(
        &self,
        key: &ArtifactKey,
        artifact: &RenderedArtifact,
    ) -> Result<String, ArtifactStoreError> {
        let root = Arc::clone(&self.root);
        let owned_key = key.clone();
        let contents = artifact.bytes.clone();
        tokio::task::spawn_blocking(move || store_blocking(&root, &owned_key, &contents))
            .await
            .map_err(|err| ArtifactStoreError::write(err.to_string()))??;

        debug!(%key, bytes = artifact.bytes.len(), "artifact stored");
        Ok(self.public_url(key))
    }
}
