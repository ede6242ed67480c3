//! Up-front rejection of deployments racing on the same pointers.

use crate::domain::entities::{EntityType, Pointer};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

type PointerKey = (EntityType, Pointer);

/// Pointers of every deployment currently between admission and commit.
#[derive(Default)]
pub struct InFlightPointers {
    reserved: Mutex<HashSet<PointerKey>>,
}

impl InFlightPointers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve all of `pointers` or none of them.
    ///
    /// On conflict returns the contended pointers, in the order given.
    pub fn try_reserve(
        self: &Arc<Self>,
        entity_type: EntityType,
        pointers: &[Pointer],
    ) -> Result<PointerReservation, Vec<Pointer>> {
        let mut reserved = self.reserved.lock();
        let contended: Vec<Pointer> = pointers
            .iter()
            .filter(|p| reserved.contains(&(entity_type, (*p).clone())))
            .cloned()
            .collect();
        if !contended.is_empty() {
            return Err(contended);
        }

        let keys: Vec<PointerKey> = pointers.iter().map(|p| (entity_type, p.clone())).collect();
        reserved.extend(keys.iter().cloned());
        Ok(PointerReservation {
            owner: Arc::clone(self),
            keys,
        })
    }

    pub fn len(&self) -> usize {
        self.reserved.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserved.lock().is_empty()
    }
}

/// Released on drop, whether the deployment committed, failed or panicked.
pub struct PointerReservation {
    owner: Arc<InFlightPointers>,
    keys: Vec<PointerKey>,
}

impl Drop for PointerReservation {
    fn drop(&mut self) {
        let mut reserved = self.owner.reserved.lock();
        for key in &self.keys {
            reserved.remove(key);
        }
    }
}
