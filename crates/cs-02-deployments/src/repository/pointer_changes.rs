//! Persisted deltas feeding the pointer-changes audit feed.

use super::keys;
use super::transaction::StoreTransaction;
use super::{decode, encode};
use crate::domain::errors::DeploymentError;
use crate::domain::value_objects::{PointerChanges, PointerChangesFilter};

#[derive(Default)]
pub struct PointerChangesRepository;

impl PointerChangesRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn save_pointer_changes(
        &self,
        tx: &mut StoreTransaction<'_>,
        changes: &PointerChanges,
    ) -> Result<(), DeploymentError> {
        tx.put(
            keys::pointer_changes(changes.local_timestamp, changes.deployment_id),
            encode(changes)?,
        );
        Ok(())
    }

    /// Matching rows in ascending local timestamp order.
    pub fn get_pointer_changes(
        &self,
        tx: &StoreTransaction<'_>,
        filter: &PointerChangesFilter,
    ) -> Result<Vec<PointerChanges>, DeploymentError> {
        let limit = filter.limit.unwrap_or(usize::MAX);
        let (start, end) =
            keys::pointer_changes_range(filter.from_local_timestamp, filter.to_local_timestamp);
        let mut result = Vec::new();
        for (_, bytes) in tx.range_scan(&start, &end)? {
            if result.len() >= limit {
                break;
            }
            let changes: PointerChanges = decode(&bytes)?;
            if filter.matches(&changes) {
                result.push(changes);
            }
        }
        Ok(result)
    }
}
