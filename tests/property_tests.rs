//! Property-based tests for memory logs and fusion.
//!
//! Uses proptest to verify invariants across random inputs:
//! - A memory log never exceeds its capacity and keeps the newest samples
//! - `recent` returns `min(n, len)` samples in insertion order
//! - Persisted logs restore element-wise equal
//! - Fusion selects the highest weight, lowest index on ties

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use octopus::coordinators::select_best;
use octopus::{MemoryLog, MemorySample};
use proptest::prelude::*;
use tempfile::TempDir;

fn samples(prefix: &str, count: usize) -> Vec<MemorySample> {
    (0..count)
        .map(|i| MemorySample::new(format!("{prefix}{i}"), format!("t{prefix}{i}")))
        .collect()
}

proptest! {
    /// Property: appending `k` samples to `s` with capacity `m` leaves the
    /// newest `min(s + k, m)` in order.
    #[test]
    fn prop_append_keeps_newest(existing in 0usize..20, added in 0usize..20, capacity in 1usize..25) {
        let mut log = MemoryLog::new(capacity);
        let first = samples("a", existing);
        let second = samples("b", added);
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let all: Vec<_> = first.into_iter().chain(second).collect();
        let expected_len = (existing + added).min(capacity);
        prop_assert_eq!(log.len(), expected_len);
        prop_assert_eq!(log.recent(usize::MAX), all[all.len() - expected_len..].to_vec());
    }

    /// Property: `recent(n)` returns `min(n, len)` samples without timestamps.
    #[test]
    fn prop_recent_bounded(len in 0usize..30, n in 0usize..40) {
        let mut log = MemoryLog::new(100);
        log.append(&samples("s", len)).unwrap();
        let recent = log.recent(n);
        prop_assert_eq!(recent.len(), n.min(len));
        for sample in &recent {
            let value = serde_json::to_value(sample).unwrap();
            prop_assert!(value.get("timestamp").is_none());
        }
        if let Some(last) = recent.last() {
            prop_assert_eq!(&last.source, &format!("s{}", len - 1));
        }
    }

    /// Property: fusion picks a maximal weight at the lowest such index.
    #[test]
    fn prop_select_best_lowest_max(weights in prop::collection::vec(0u8..4, 1..12)) {
        let floats: Vec<f32> = weights.iter().map(|w| f32::from(*w) / 4.0).collect();
        let best = select_best(&floats).unwrap();
        let max = floats.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        prop_assert!((floats[best] - max).abs() < f32::EPSILON);
        prop_assert!(floats[..best].iter().all(|w| *w < max));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: persist then reopen yields the same sample sequence.
    #[test]
    fn prop_persist_restore_roundtrip(count in 0usize..12, capacity in 1usize..10) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory").join("unit.json");
        let mut log = MemoryLog::new(capacity).with_path(&path).with_auto_persist(false);
        log.append(&samples("p", count)).unwrap();
        log.persist().unwrap();

        let reopened = MemoryLog::open(&path, capacity, false).unwrap();
        prop_assert_eq!(reopened.recent(usize::MAX), log.recent(usize::MAX));
    }
}
