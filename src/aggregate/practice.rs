//! Practice-level coding distribution.

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::cohort::Cohort;
use crate::error::Result;

/// Fixed count buckets for the practice histogram
const BUCKET_LABELS: [&str; 8] = ["0", "1", "2", "3", "4", "5", "6-10", "11+"];

/// Histogram of per-practice outcome counts over fixed buckets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeDistribution {
    /// `(bucket label, number of practices)` in bucket order
    pub buckets: Vec<(String, u64)>,
}

/// Headline numbers for the practice coding summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeSummary {
    /// Practices represented in the cohort
    pub practice_count: usize,
    /// Total patients with the outcome across all practices
    pub total_coded: u64,
    /// Patients with the outcome in the ten highest-coding practices
    pub top_ten_count: u64,
}

/// Positive outcome count per practice.
///
/// Every practice observed in the cohort appears, zero-count ones
/// included; patients with no recorded practice are left out.
pub fn practice_outcome_counts(cohort: &Cohort, outcome: &str) -> Result<FxHashMap<u32, u64>> {
    let flags = cohort.bool_column(outcome)?;
    let mut counts: FxHashMap<u32, u64> = FxHashMap::default();
    for (practice, &positive) in cohort.practice_ids().iter().zip(&flags) {
        if let Some(practice) = practice {
            let entry = counts.entry(*practice).or_insert(0);
            if positive {
                *entry += 1;
            }
        }
    }
    Ok(counts)
}

fn bucket_index(count: u64) -> usize {
    match count {
        0..=5 => count as usize,
        6..=10 => 6,
        _ => 7,
    }
}

/// Bucket per-practice counts into the fixed histogram ranges
#[must_use]
pub fn practice_distribution(counts: &FxHashMap<u32, u64>) -> PracticeDistribution {
    let mut buckets = [0u64; BUCKET_LABELS.len()];
    for &count in counts.values() {
        buckets[bucket_index(count)] += 1;
    }
    PracticeDistribution {
        buckets: BUCKET_LABELS
            .iter()
            .zip(buckets)
            .map(|(label, n)| ((*label).to_string(), n))
            .collect(),
    }
}

/// Summarise total coding and concentration in the top ten practices
#[must_use]
pub fn practice_summary(counts: &FxHashMap<u32, u64>) -> PracticeSummary {
    let total_coded: u64 = counts.values().sum();
    let top_ten_count: u64 = counts
        .values()
        .copied()
        .sorted_unstable()
        .rev()
        .take(10)
        .sum();
    PracticeSummary {
        practice_count: counts.len(),
        total_coded,
        top_ten_count,
    }
}
