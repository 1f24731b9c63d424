use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};
use std::sync::Once;

use crate::error::Result;
use crate::manifest::SkipReason;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Counter for manifest loads by outcome
    pub static ref MANIFEST_LOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("retro_manifest_loads_total", "Total number of manifest loads by result"),
        &["result"]
    ).expect("Failed to create manifest loads counter");

    /// Counter for manifest entries left out of a load
    pub static ref MANIFEST_ENTRIES_SKIPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("retro_manifest_entries_skipped_total", "Manifest entries skipped while loading"),
        &["reason"]
    ).expect("Failed to create skipped entries counter");

    /// Counter for recorded frames
    pub static ref FRAMES_TOTAL: Counter = Counter::new(
        "retro_frames_total", "Total number of frames recorded into the RAM history"
    ).expect("Failed to create frames counter");

    /// Counter for filtered actions
    pub static ref ACTIONS_FILTERED_TOTAL: Counter = Counter::new(
        "retro_actions_filtered_total", "Total number of actions passed through the action filter"
    ).expect("Failed to create filtered actions counter");

    /// Counter for variable lookups by where the name resolved
    pub static ref VARIABLE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("retro_variable_lookups_total", "Variable lookups by resolution source"),
        &["source"]
    ).expect("Failed to create variable lookups counter");

    /// Gauge for the size of the variable table
    pub static ref VARIABLES: Gauge = Gauge::new(
        "retro_variables", "Number of memory variables currently defined"
    ).expect("Failed to create variables gauge");
}

static INIT: Once = Once::new();

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(MANIFEST_LOADS_TOTAL.clone()))
            .expect("Failed to register manifest loads counter");

        REGISTRY
            .register(Box::new(MANIFEST_ENTRIES_SKIPPED_TOTAL.clone()))
            .expect("Failed to register skipped entries counter");

        REGISTRY
            .register(Box::new(FRAMES_TOTAL.clone()))
            .expect("Failed to register frames counter");

        REGISTRY
            .register(Box::new(ACTIONS_FILTERED_TOTAL.clone()))
            .expect("Failed to register filtered actions counter");

        REGISTRY
            .register(Box::new(VARIABLE_LOOKUPS_TOTAL.clone()))
            .expect("Failed to register variable lookups counter");

        REGISTRY
            .register(Box::new(VARIABLES.clone()))
            .expect("Failed to register variables gauge");
    });
}

/// Text exposition of everything in [`REGISTRY`].
pub fn gather_text() -> Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    Ok(encoder.encode_to_string(&metric_families)?)
}

/// Record the outcome of a manifest load
pub fn record_manifest_load(ok: bool, skipped: &[(String, SkipReason)]) {
    let result = if ok { "ok" } else { "error" };
    MANIFEST_LOADS_TOTAL.with_label_values(&[result]).inc();

    for (_, reason) in skipped {
        MANIFEST_ENTRIES_SKIPPED_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
    }
}

pub fn record_frame() {
    FRAMES_TOTAL.inc();
}

pub fn record_action_filtered() {
    ACTIONS_FILTERED_TOTAL.inc();
}

/// Record where a name lookup resolved: `custom`, `memory` or `missing`
pub fn record_lookup(source: &str) {
    VARIABLE_LOOKUPS_TOTAL.with_label_values(&[source]).inc();
}

pub fn set_variable_count(count: usize) {
    VARIABLES.set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics();
        init_metrics();
        record_frame();
        record_manifest_load(true, &[("x".to_string(), SkipReason::MissingType)]);

        let text = gather_text().unwrap();
        assert!(text.contains("retro_frames_total"));
        assert!(text.contains("missing_type"));
    }

    #[test]
    fn test_encoder_errors_are_surfaced() {
        let err: crate::error::Error = prometheus::Error::Msg("bad family".to_string()).into();
        assert_eq!(err.kind(), crate::error::ErrorKind::Format);
        assert!(err.to_string().contains("bad family"));
    }
}
