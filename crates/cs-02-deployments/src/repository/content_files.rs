//! Content-file references and the GC eligibility query.

use super::deployments::DeploymentsRepository;
use super::keys;
use super::transaction::StoreTransaction;
use super::encode;
use crate::domain::entities::{ContentFile, ContentHash, Deployment, DeploymentId, Timestamp};
use crate::domain::errors::{DeploymentError, KVStoreError};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
pub struct ContentFilesRepository;

/// Verdict accumulated over every row of one hash.
#[derive(Default)]
struct HashUsage {
    considered: usize,
    in_use: bool,
}

impl ContentFilesRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn save_content_files(
        &self,
        tx: &mut StoreTransaction<'_>,
        deployment_id: DeploymentId,
        content: &[ContentFile],
    ) -> Result<(), DeploymentError> {
        for file in content {
            tx.put(
                keys::content_file(&file.hash, deployment_id),
                encode(&file.file)?,
            );
        }
        Ok(())
    }

    /// Deployments referencing `hash`, with the file name each gave it.
    #[cfg(test)]
    pub(crate) fn get_content_files(
        &self,
        tx: &StoreTransaction<'_>,
        hash: &str,
    ) -> Result<Vec<(DeploymentId, String)>, DeploymentError> {
        let mut files = Vec::new();
        for (key, value) in tx.prefix_scan(&keys::content_file_prefix(hash))? {
            files.push((parse_id(&key)?, super::decode(&value)?));
        }
        Ok(files)
    }

    /// Hashes whose every relevant referencing deployment is superseded.
    ///
    /// A row is relevant if its deployment is still current, or was
    /// superseded by a deployment this replica accepted after `last_gc_time`.
    /// Rows superseded before the watermark were settled by an earlier sweep.
    /// A hash is returned iff it has at least one relevant row and none of
    /// its relevant rows belongs to a current deployment.
    pub fn find_content_hashes_not_being_used_anymore(
        &self,
        tx: &StoreTransaction<'_>,
        deployments: &DeploymentsRepository,
        last_gc_time: Timestamp,
    ) -> Result<Vec<ContentHash>, DeploymentError> {
        let mut loaded: HashMap<DeploymentId, Deployment> = HashMap::new();
        let mut usage: BTreeMap<ContentHash, HashUsage> = BTreeMap::new();

        for (key, _) in tx.prefix_scan(keys::CONTENT_FILE_PREFIX)? {
            let hash = keys::content_hash(&key).ok_or_else(|| KVStoreError::CorruptionError {
                message: "malformed content file key".to_string(),
            })?;
            let deployment_id = parse_id(&key)?;
            let deleter = load(tx, deployments, &mut loaded, deployment_id)?.deleter_deployment;

            let entry = usage.entry(hash.to_string()).or_default();
            match deleter {
                None => {
                    entry.considered += 1;
                    entry.in_use = true;
                }
                Some(deleter_id) => {
                    let deleter_local_timestamp =
                        load(tx, deployments, &mut loaded, deleter_id)?.local_timestamp;
                    if deleter_local_timestamp > last_gc_time {
                        entry.considered += 1;
                    }
                }
            }
        }

        Ok(usage
            .into_iter()
            .filter(|(_, u)| u.considered > 0 && !u.in_use)
            .map(|(hash, _)| hash)
            .collect())
    }
}

fn parse_id(key: &[u8]) -> Result<DeploymentId, DeploymentError> {
    keys::trailing_id(key).ok_or_else(|| {
        KVStoreError::CorruptionError {
            message: "malformed content file key".to_string(),
        }
        .into()
    })
}

fn load<'m>(
    tx: &StoreTransaction<'_>,
    deployments: &DeploymentsRepository,
    loaded: &'m mut HashMap<DeploymentId, Deployment>,
    id: DeploymentId,
) -> Result<&'m Deployment, DeploymentError> {
    if !loaded.contains_key(&id) {
        let deployment = deployments.get_referenced_deployment(tx, id)?;
        loaded.insert(id, deployment);
    }
    loaded.get(&id).ok_or_else(|| {
        KVStoreError::CorruptionError {
            message: format!("deployment {} vanished during scan", id),
        }
        .into()
    })
}
