//! Domain module for Deployments
//!
//! Contains core entities, value objects, the ordering rule, pointer
//! resolution, errors, and invariants.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod ordering;
pub mod pointers;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use ordering::*;
pub use value_objects::*;
