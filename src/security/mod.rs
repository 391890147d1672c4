//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → flood.rs (global per-second admission counter)
//!     → [routing layer resolves the route]
//!     → cidr.rs (per-route peer + forwarded-for allow list)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Flood gate is process-wide, not per-route or per-client
//! - CIDR checks fail closed: unparsable addresses deny
//! - No trust in client input except where the route opts in

pub mod cidr;
pub mod flood;

pub use flood::FloodGate;
