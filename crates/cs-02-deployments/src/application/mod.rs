//! Application layer: engine, async service, contention guard and GC.

pub mod contention;
pub mod engine;
pub mod garbage_collection;
pub mod pointer_manager;
pub mod service;

pub use contention::{InFlightPointers, PointerReservation};
pub use engine::ConsistencyEngine;
pub use garbage_collection::GarbageCollectionManager;
pub use pointer_manager::PointerManager;
pub use service::DeploymentService;
