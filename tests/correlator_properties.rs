// tests/correlator_properties.rs
//! Property tests for request correlation and rolling retention

use eeg_core::acquisition::{RollingWindow, SampleStore};
use eeg_core::session::{Completion, PendingOperations, SessionError};
use ndarray::Array2;
use proptest::prelude::*;

fn latency(completion: Completion) -> Option<f32> {
    match completion {
        Completion::Latency(seconds) => Some(seconds),
        _ => None,
    }
}

proptest! {
    #[test]
    fn prop_each_request_resolves_exactly_once(
        requests in 1usize..40,
        deliveries in proptest::collection::vec(0usize..60, 0..120),
    ) {
        let ops = PendingOperations::new();
        let pending: Vec<_> = (0..requests).map(|_| ops.issue(latency)).collect();

        let mut resolved = vec![0u32; requests];
        for target in deliveries {
            let accepted = ops.complete(target, Completion::Latency(target as f32));
            if target < requests {
                if accepted {
                    resolved[target] += 1;
                }
            } else {
                prop_assert!(!accepted);
            }
        }

        for (index, p) in pending.iter().enumerate() {
            prop_assert!(resolved[index] <= 1);
            match p.try_result() {
                Some(result) => {
                    prop_assert_eq!(resolved[index], 1);
                    prop_assert_eq!(result, Ok(index as f32));
                }
                None => prop_assert_eq!(resolved[index], 0),
            }
        }

        let outstanding = resolved.iter().filter(|&&n| n == 0).count();
        prop_assert_eq!(ops.len(), outstanding);
        prop_assert_eq!(ops.fail_all(SessionError::Disconnected), outstanding);
        prop_assert!(ops.is_empty());

        for (index, p) in pending.iter().enumerate() {
            let expected = if resolved[index] == 1 {
                Ok(index as f32)
            } else {
                Err(SessionError::Disconnected)
            };
            prop_assert_eq!(p.try_result(), Some(expected));
        }
    }

    #[test]
    fn prop_indices_unique_across_wraparound(
        start_offset in 0usize..8,
        live in 1usize..16,
    ) {
        let ops = PendingOperations::starting_at(usize::MAX - start_offset);
        let pending: Vec<_> = (0..live).map(|_| ops.issue(latency)).collect();

        let mut indices: Vec<usize> = pending.iter().map(|p| p.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        prop_assert_eq!(indices.len(), live);
    }

    #[test]
    fn prop_roll_retains_most_recent_width(
        width in 1usize..64,
        blocks in proptest::collection::vec(0usize..40, 0..20),
    ) {
        let mut window = RollingWindow::new(1, width).unwrap();
        let mut history: Vec<f64> = Vec::new();

        for size in blocks {
            let start = history.len();
            let block = Array2::from_shape_fn((1, size), |(_, c)| (start + c + 1) as f64);
            window.ingest(block.view()).unwrap();
            history.extend(block.iter().copied());
        }

        let mut expected = vec![0.0; width.saturating_sub(history.len())];
        expected.extend(history.iter().skip(history.len().saturating_sub(width)));

        prop_assert_eq!(window.tail(width).row(0).to_vec(), expected);
        prop_assert_eq!(window.total_ingested(), history.len() as u64);
        prop_assert_eq!(window.origin(), history.len() as i64 - width as i64);
    }
}
