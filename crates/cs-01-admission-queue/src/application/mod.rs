//! Application layer for the Admission Queue.

pub mod queue;
