//! # CS-01: Admission Queue
//!
//! Priority-aware, bounded concurrency gate placed in front of every storage
//! operation of the content server.
//!
//! ## Architecture
//!
//! - **Domain**: `Priority`, `QueueError`
//! - **Application**: `AdmissionQueue` (slot hand-off, priority waiters, deadlines)
//! - **Config**: `QueueConfig` with environment overrides
//!
//! ## Admission Rules
//!
//! | Rule | Description |
//! |------|-------------|
//! | Bounded workers | At most `max_concurrency` tasks execute at once |
//! | Bounded waiting | LOW tasks are refused once `max_queued` tasks wait |
//! | HIGH never refused | HIGH tasks always enter the queue and are served first |
//! | Deadline | A task waiting or running past `timeout` fails for its caller |
//!
//! A timed-out task that already started keeps running to completion; only the
//! caller stops waiting for it.

pub mod application;
pub mod config;
pub mod domain;

pub use application::queue::AdmissionQueue;
pub use config::QueueConfig;
pub use domain::errors::QueueError;
pub use domain::value_objects::Priority;
