//! Cross-crate integration tests.

pub mod admission;
pub mod convergence;
pub mod gc;
pub mod scenarios;
