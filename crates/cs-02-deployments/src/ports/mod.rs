//! # Ports Layer
//!
//! - `inbound.rs` - Driving ports (API exposed to the deployment pipeline and read paths)
//! - `outbound.rs` - Driven ports (storage, clock, content blobs, active-entity cache)

pub mod inbound;
pub mod outbound;
