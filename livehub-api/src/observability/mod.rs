//! Observability for the hub: prometheus metrics

pub mod metrics;

pub use metrics::gather_metrics;
