//! Error types for Deployments
//!
//! Two classes of failure reach callers:
//! - retryable with no special handling (contention, queue saturation, queue timeout)
//! - fatal to the current deployment attempt only (everything else)

use crate::domain::entities::{EntityId, Pointer};
use cs_01_admission_queue::QueueError;
use thiserror::Error;

/// All errors that can occur while deploying or querying deployments
#[derive(Debug, Error)]
pub enum DeploymentError {
    /// Another deployment touching these pointers is in flight
    #[error("Pointers currently being deployed: {pointers:?}")]
    PointersBeingDeployed { pointers: Vec<Pointer> },

    /// Entity id already accepted by this replica (terminal)
    #[error("Entity already deployed: {entity_id}")]
    AlreadyDeployed { entity_id: EntityId },

    /// Entity cannot be ordered (no pointers, no id, unknown type)
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// Admission queue refused or abandoned the task
    #[error("Admission queue: {0}")]
    Queue(#[from] QueueError),

    /// Storage backend failure, propagated unchanged
    #[error("Storage error: {0}")]
    Storage(#[from] KVStoreError),

    /// Row encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Content blob store failure during garbage collection
    #[error("Content storage error: {0}")]
    ContentStorage(String),
}

impl DeploymentError {
    /// Whether the caller can simply resubmit.
    ///
    /// A queue timeout does not imply the write failed; callers should
    /// re-query state before resubmitting.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeploymentError::PointersBeingDeployed { .. } => true,
            DeploymentError::Queue(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<bincode::Error> for DeploymentError {
    fn from(err: bincode::Error) -> Self {
        DeploymentError::Serialization(err.to_string())
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}
