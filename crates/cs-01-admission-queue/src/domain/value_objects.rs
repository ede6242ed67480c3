//! Value objects for the Admission Queue.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling class of a submitted task.
///
/// HIGH is used for consistency-critical writes (deployments, denylist
/// mutations); LOW for reads and maintenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
