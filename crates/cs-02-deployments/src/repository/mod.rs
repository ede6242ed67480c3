//! # Repositories
//!
//! Explicit repository structs over one [`StoreTransaction`], built once by
//! the engine and passed by reference. Rows are `serde` structs encoded with
//! `bincode`.

pub mod content_files;
pub mod deployments;
pub mod keys;
pub mod last_deployed_pointers;
pub mod pointer_changes;
pub mod transaction;

pub use content_files::ContentFilesRepository;
pub use deployments::DeploymentsRepository;
pub use last_deployed_pointers::LastDeployedPointersRepository;
pub use pointer_changes::PointerChangesRepository;
pub use transaction::StoreTransaction;

use crate::domain::errors::DeploymentError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DeploymentError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DeploymentError> {
    Ok(bincode::deserialize(bytes)?)
}
