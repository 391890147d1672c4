//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, host header)
//!     → table.rs (candidate collection, priority selection)
//!     → matcher.rs (wildcard predicate per route)
//!     → Return: matched Route or None
//!
//! Table build (at startup):
//!     (pattern, RouteSpec)[] in document order
//!     → Compile wildcard patterns and CIDR lists
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Lookup is a linear scan in insertion order; determinism over speed
//! - Priority selects among candidates, insertion order breaks ties
//! - Explicit None rather than a silent default route

pub mod matcher;
pub mod table;

pub use matcher::PathPattern;
pub use table::{Route, RouteTable};
