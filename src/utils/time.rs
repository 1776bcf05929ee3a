// src/utils/time.rs
//! Conversions between sample counts and seconds

/// Whole samples covered by `seconds` at `sample_rate`, rounded down.
///
/// Negative, NaN and zero inputs yield 0.
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    let samples = (seconds * sample_rate).floor();
    if samples.is_nan() || samples <= 0.0 {
        0
    } else {
        samples as usize
    }
}

/// Duration of `samples` at `sample_rate`; signed so offsets before a
/// reference point stay negative
pub fn samples_to_seconds(samples: i64, sample_rate: f64) -> f64 {
    if sample_rate <= 0.0 {
        return 0.0;
    }
    samples as f64 / sample_rate
}
