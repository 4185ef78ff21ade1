//! Metric names.
//!
//! The library only records through the `metrics` facade; installing a
//! recorder is left to the embedding application.

/// Counter of translate calls, labelled by `mode` and `status`.
pub const TRANSLATE_TOTAL: &str = "octopus_translate_total";

/// Histogram of translate latency in milliseconds, labelled by `mode`.
pub const TRANSLATE_DURATION_MS: &str = "octopus_translate_duration_ms";

/// Counter of samples appended to memory logs.
pub const MEMORY_SAMPLES_APPENDED_TOTAL: &str = "octopus_memory_samples_appended_total";

/// Counter of memory log persists.
pub const MEMORY_PERSIST_TOTAL: &str = "octopus_memory_persist_total";

/// Registers descriptions for every metric with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(TRANSLATE_TOTAL, "Translate calls");
    metrics::describe_histogram!(
        TRANSLATE_DURATION_MS,
        metrics::Unit::Milliseconds,
        "Translate latency"
    );
    metrics::describe_counter!(
        MEMORY_SAMPLES_APPENDED_TOTAL,
        "Samples appended to memory logs"
    );
    metrics::describe_counter!(MEMORY_PERSIST_TOTAL, "Memory log persists");
}
