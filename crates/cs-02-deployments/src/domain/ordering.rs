//! The ordering rule shared by every replica.
//!
//! `a` happened before `b` iff `a.timestamp < b.timestamp`, or the timestamps
//! are equal and `a.entity_id < b.entity_id` (byte-wise lexicographic).
//! Only data carried by the entity itself takes part, never local clocks or
//! arrival order, so independent replicas agree without talking to each other.

use crate::domain::entities::{Deployment, Entity, Timestamp};
use std::cmp::Ordering;

/// Anything positioned on the global deployment timeline.
pub trait Chronological {
    fn entity_timestamp(&self) -> Timestamp;
    fn entity_id(&self) -> &str;
}

impl Chronological for Entity {
    fn entity_timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Chronological for Deployment {
    fn entity_timestamp(&self) -> Timestamp {
        self.entity_timestamp
    }

    fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

/// Total order over (timestamp, entity id).
pub fn compare<A, B>(a: &A, b: &B) -> Ordering
where
    A: Chronological + ?Sized,
    B: Chronological + ?Sized,
{
    a.entity_timestamp()
        .cmp(&b.entity_timestamp())
        .then_with(|| a.entity_id().cmp(b.entity_id()))
}

/// Strict, irreflexive ordering predicate.
pub fn happened_before<A, B>(a: &A, b: &B) -> bool
where
    A: Chronological + ?Sized,
    B: Chronological + ?Sized,
{
    compare(a, b) == Ordering::Less
}
