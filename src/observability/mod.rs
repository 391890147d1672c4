//! Observability subsystem.
//!
//! Structured logs come from `tracing` calls at the point of action; this
//! module owns the Prometheus exporter and the counter helpers the pipeline
//! records into.

pub mod metrics;
