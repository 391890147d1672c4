//! TLS-terminating reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────┐
//!                         │                  EDGE PROXY                     │
//!                         │                                                 │
//!   TLS handshake ────────┼─▶ tls (SNI → certificate)                       │
//!                         │        │                                        │
//!   Request ──────────────┼─▶ http/server (upgrade demux, admission)        │
//!                         │        │  security/flood → routing/table        │
//!                         │        │  → security/cidr                       │
//!                         │        ▼                                        │
//!                         │   http/dispatch                                 │
//!                         │    ├─ handler target  → body                    │
//!                         │    ├─ file target     → body                    │
//!                         │    ├─ remote / pool   → http/proxy ──▶ upstream │
//!                         │    └─ upgrade         → http/websocket ─▶ ws    │
//!                         │        │                                        │
//!   Response ◀────────────┼── http/respond (errors, static bodies)          │
//!                         └────────────────────────────────────────────────┘
//! ```
//!
//! Routes come from a JSON document plus bundle files; hooks and handler
//! targets are attached programmatically to the in-memory route set.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;
pub mod tls;

// Admission
pub mod security;

// Extension points
pub mod hooks;

// Cross-cutting concerns
pub mod error;
pub mod observability;

pub use config::{load_routes, ProxyConfig, RouteSpec, Target};
pub use http::{build_app, AppState, Responder};
pub use routing::RouteTable;
pub use security::FloodGate;
