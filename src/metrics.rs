// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    describe_counter, describe_gauge, describe_histogram, gauge, histogram, increment_counter,
    Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{describe_counter, describe_gauge, describe_histogram, gauge, histogram, increment_counter};

use std::time::Duration;

/// Initializes the descriptions for all the metrics in the SDK.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "sdk_cache_hits_total",
        Unit::Count,
        "Cache hits, labeled by cache (token, pair)."
    );
    describe_counter!(
        "sdk_cache_misses_total",
        Unit::Count,
        "Cache misses, labeled by cache (token, pair)."
    );
    describe_gauge!("sdk_cache_size", "Current entries per cache.");
    describe_counter!(
        "sdk_rpc_calls_total",
        Unit::Count,
        "Chain reads and writes, labeled by component and method."
    );
    describe_counter!(
        "sdk_route_resolutions_total",
        Unit::Count,
        "Route resolutions, labeled by outcome (direct, multi_hop, not_found, unsupported)."
    );
    describe_histogram!(
        "sdk_quote_latency_ms",
        "Latency of a full quote (one or two chained router calls) in milliseconds."
    );
    describe_counter!(
        "sdk_stale_results_discarded_total",
        Unit::Count,
        "Async results discarded because their inputs were superseded, labeled by node."
    );
    describe_counter!(
        "sdk_transactions_total",
        Unit::Count,
        "Submitted transactions, labeled by action and outcome."
    );
}

pub fn increment_cache_hit(cache: &str) {
    increment_counter!("sdk_cache_hits_total", "cache" => cache.to_string());
}

pub fn increment_cache_miss(cache: &str) {
    increment_counter!("sdk_cache_misses_total", "cache" => cache.to_string());
}

pub fn set_cache_size(cache: &str, size: f64) {
    gauge!("sdk_cache_size", size, "cache" => cache.to_string());
}

pub fn increment_rpc_call(component: &str, method: &str) {
    increment_counter!(
        "sdk_rpc_calls_total",
        "component" => component.to_string(),
        "method" => method.to_string()
    );
}

pub fn increment_route_resolution(outcome: &str) {
    increment_counter!("sdk_route_resolutions_total", "outcome" => outcome.to_string());
}

pub fn record_quote_latency(route_kind: &str, duration: Duration) {
    histogram!(
        "sdk_quote_latency_ms",
        duration.as_secs_f64() * 1000.0,
        "route" => route_kind.to_string()
    );
}

pub fn increment_stale_discard(node: &str) {
    increment_counter!("sdk_stale_results_discarded_total", "node" => node.to_string());
}

pub fn increment_transaction(action: &str, outcome: &str) {
    increment_counter!(
        "sdk_transactions_total",
        "action" => action.to_string(),
        "outcome" => outcome.to_string()
    );
}
