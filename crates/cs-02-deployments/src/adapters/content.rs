use crate::domain::entities::ContentHash;
use crate::domain::errors::DeploymentError;
use crate::ports::outbound::ContentStorage;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// In-memory content blob store.
#[derive(Default)]
pub struct InMemoryContentStorage {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl InMemoryContentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, hash: impl Into<ContentHash>, data: Vec<u8>) {
        self.blobs.write().insert(hash.into(), data);
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.blobs.read().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl ContentStorage for InMemoryContentStorage {
    async fn delete(&self, hashes: &[ContentHash]) -> Result<(), DeploymentError> {
        let mut blobs = self.blobs.write();
        for hash in hashes {
            blobs.remove(hash);
        }
        Ok(())
    }
}

/// Content blobs stored as one file per hash under a root directory.
pub struct FsContentStorage {
    root: PathBuf,
}

impl FsContentStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }
}

#[async_trait]
impl ContentStorage for FsContentStorage {
    async fn delete(&self, hashes: &[ContentHash]) -> Result<(), DeploymentError> {
        for hash in hashes {
            match tokio::fs::remove_file(self.blob_path(hash)).await {
                Ok(()) => {}
                // already gone
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(hash = %hash, "Blob missing on delete");
                }
                Err(e) => {
                    return Err(DeploymentError::ContentStorage(format!(
                        "failed to delete {}: {}",
                        hash, e
                    )))
                }
            }
        }
        Ok(())
    }
}
