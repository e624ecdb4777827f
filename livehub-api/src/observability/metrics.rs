//! Prometheus metrics for `LiveHub`
//!
//! Connection and room gauges, per-command counters and delivery failures.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Registry private to the hub
static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// --- Connection Metrics ---

/// Open WebSocket connections.
pub static CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "livehub_connections_active",
        "Number of open WebSocket connections",
    )
    .expect("failed to create livehub_connections_active")
});

/// Connections accepted since start.
pub static CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "livehub_connections_total",
        "Total number of WebSocket connections accepted",
    )
    .expect("failed to create livehub_connections_total")
});

// --- Room Metrics ---

/// Rooms with at least one member.
pub static ROOMS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("livehub_rooms_active", "Number of rooms with members")
        .expect("failed to create livehub_rooms_active")
});

// --- Command Metrics ---

/// Decoded commands, labeled by wire type.
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("livehub_commands_total", "Total number of decoded commands"),
        &["command"],
    )
    .expect("failed to create livehub_commands_total")
});

/// Error replies, labeled by error code.
pub static COMMAND_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "livehub_command_errors_total",
            "Total number of error replies sent to clients",
        ),
        &["code"],
    )
    .expect("failed to create livehub_command_errors_total")
});

// --- Delivery Metrics ---

/// Events dropped because a recipient queue was full or closed.
pub static BROADCAST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "livehub_broadcast_failures_total",
        "Total number of events dropped for a recipient",
    )
    .expect("failed to create livehub_broadcast_failures_total")
});

// --- Gift Metrics ---

/// Value of delivered gifts, in cents.
pub static GIFT_VALUE_CENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "livehub_gift_value_cents_total",
        "Total value of gifts sent, in cents",
    )
    .expect("failed to create livehub_gift_value_cents_total")
});

/// Register all metrics with the registry.
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONNECTIONS_ACTIVE.clone()))
        .expect("failed to register livehub_connections_active");
    registry
        .register(Box::new(CONNECTIONS_TOTAL.clone()))
        .expect("failed to register livehub_connections_total");
    registry
        .register(Box::new(ROOMS_ACTIVE.clone()))
        .expect("failed to register livehub_rooms_active");
    registry
        .register(Box::new(COMMANDS_TOTAL.clone()))
        .expect("failed to register livehub_commands_total");
    registry
        .register(Box::new(COMMAND_ERRORS_TOTAL.clone()))
        .expect("failed to register livehub_command_errors_total");
    registry
        .register(Box::new(BROADCAST_FAILURES_TOTAL.clone()))
        .expect("failed to register livehub_broadcast_failures_total");
    registry
        .register(Box::new(GIFT_VALUE_CENTS_TOTAL.clone()))
        .expect("failed to register livehub_gift_value_cents_total");
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
