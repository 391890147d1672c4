//! Configuration subsystem.
//!
//! Process-level settings come from the environment; the route table comes
//! from a JSON document plus optional bundle files merged over it. Hooks and
//! handler targets cannot appear in documents and are attached to the
//! in-memory route set programmatically.

pub mod loader;
pub mod schema;

pub use loader::load_routes;
pub use schema::{ProxyConfig, RouteSpec, Target};
