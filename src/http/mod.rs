//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection
//!     → server.rs (axum app, upgrade demultiplex, admission pipeline)
//!     → dispatch.rs (target switch: handler / file / remote / pool)
//!     → proxy.rs or websocket.rs (upstream exchange, hooks, CORS)
//!     → respond.rs (error bodies, static overrides)
//! ```

pub mod context;
pub mod dispatch;
pub mod proxy;
pub mod respond;
pub mod server;
pub mod websocket;

pub use context::InboundContext;
pub use respond::{Denial, Responder};
pub use server::{build_app, AppState};
