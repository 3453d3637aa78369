// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Summary statistics over replicate timings.

use serde::{Deserialize, Serialize};

/// Descriptive statistics for one path's samples, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl SampleSummary {
    /// Summarize a sample sequence. Empty sequences (unsupported) yield `None`.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let len = sorted.len();

        let mean = sorted.iter().sum::<f64>() / len as f64;
        let median = if len % 2 == 0 {
            (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
        } else {
            sorted[len / 2]
        };
        let variance = sorted
            .iter()
            .map(|&x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / len as f64;

        Some(Self {
            count: len,
            min: sorted[0],
            max: sorted[len - 1],
            mean,
            median,
            std_dev: variance.sqrt(),
        })
    }
}

/// Format seconds in human-readable form (auto-selects ns/μs/ms/s).
pub fn format_seconds(seconds: f64) -> String {
    if seconds < 1e-6 {
        format!("{:.0}ns", seconds * 1e9)
    } else if seconds < 1e-3 {
        format!("{:.2}μs", seconds * 1e6)
    } else if seconds < 1.0 {
        format!("{:.2}ms", seconds * 1e3)
    } else {
        format!("{:.2}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_samples() {
        let samples = [0.4, 0.1, 0.3, 0.2];
        let summary = SampleSummary::from_samples(&samples).unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 0.1);
        assert_eq!(summary.max, 0.4);
        assert!((summary.mean - 0.25).abs() < 1e-12);
        assert!((summary.median - 0.25).abs() < 1e-12);
        assert!((summary.std_dev - 0.0125f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_identical_samples_have_no_spread() {
        let summary = SampleSummary::from_samples(&[0.005; 10]).unwrap();
        assert_eq!(summary.median, 0.005);
        assert!(summary.std_dev.abs() < 1e-15);
    }

    #[test]
    fn test_unsupported_has_no_summary() {
        assert!(SampleSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(5e-7), "500ns");
        assert_eq!(format_seconds(1.5e-6), "1.50μs");
        assert_eq!(format_seconds(0.0015), "1.50ms");
        assert_eq!(format_seconds(1.5), "1.50s");
    }
}
