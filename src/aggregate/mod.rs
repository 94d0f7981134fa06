//! Stratified cross-tabulation of an outcome against cohort variables.

pub mod code_frequency;
pub mod practice;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::cohort::Cohort;
use crate::error::Result;

pub use code_frequency::{code_frequency, CodeFrequencyRow};
pub use practice::{
    practice_distribution, practice_outcome_counts, practice_summary, PracticeDistribution,
    PracticeSummary,
};

/// Round to one decimal place, halves away from zero
#[must_use]
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// One stratum row of a cross-tabulation, pre-redaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabRow {
    /// Stratifying variable
    pub attribute: String,
    /// Category within the stratifier
    pub category: String,
    /// Population members in the stratum without the outcome
    pub without_outcome: u64,
    /// Population members in the stratum with the outcome
    pub with_outcome: u64,
    /// Outcome rate per 100,000 stratum members, 1 decimal place
    pub rate_per_100k: f64,
    /// Stratum share of all positive outcomes, 1 decimal place
    pub percentage: f64,
}

/// Cross-tabulates a boolean outcome against categorical stratifiers.
///
/// Every declared category of a stratifier appears in the output, including
/// zero-count categories, so each table is a complete partition of the
/// population. The partition invariant (per-category positives summing to
/// the total positive count) holds exactly pre-redaction.
#[derive(Debug)]
pub struct Aggregator<'a> {
    cohort: &'a Cohort,
    outcome_name: String,
    outcome: Vec<bool>,
}

impl<'a> Aggregator<'a> {
    /// Bind an aggregator to a cohort and its boolean outcome variable
    pub fn new(cohort: &'a Cohort, outcome: &str) -> Result<Self> {
        let flags = cohort.bool_column(outcome)?;
        Ok(Self {
            cohort,
            outcome_name: outcome.to_string(),
            outcome: flags,
        })
    }

    /// Total positive outcome count across the population
    #[must_use]
    pub fn total_positive(&self) -> u64 {
        self.outcome.iter().filter(|&&b| b).count() as u64
    }

    /// Cross-tabulate the outcome against one stratifier
    pub fn crosstab(&self, stratifier: &str) -> Result<Vec<CrosstabRow>> {
        let categories = self.cohort.category_column(stratifier)?;

        let mut counts: FxHashMap<&str, (u64, u64)> = FxHashMap::default();
        for (category, &positive) in categories.iter().zip(&self.outcome) {
            let entry = counts.entry(category).or_insert((0, 0));
            if positive {
                entry.1 += 1;
            } else {
                entry.0 += 1;
            }
        }

        // declared labels first (zero-count ones included), then anything
        // observed beyond the declaration, in stable order
        let mut labels: Vec<String> = self
            .cohort
            .labels(stratifier)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        for category in counts.keys().sorted() {
            if !labels.iter().any(|l| l == category) {
                labels.push((*category).to_string());
            }
        }

        let total_positive = self.total_positive();
        let rows = labels
            .into_iter()
            .map(|label| {
                let (without, with) = counts.get(label.as_str()).copied().unwrap_or((0, 0));
                let total = without + with;
                let rate = if total == 0 {
                    0.0
                } else {
                    round1(with as f64 / total as f64 * 100_000.0)
                };
                let percentage = if total_positive == 0 {
                    0.0
                } else {
                    round1(with as f64 / total_positive as f64 * 100.0)
                };
                CrosstabRow {
                    attribute: stratifier.to_string(),
                    category: label,
                    without_outcome: without,
                    with_outcome: with,
                    rate_per_100k: rate,
                    percentage,
                }
            })
            .collect::<Vec<_>>();

        debug_assert_eq!(
            rows.iter().map(|r| r.with_outcome).sum::<u64>(),
            total_positive,
            "stratifier {stratifier} does not partition the {} outcome",
            self.outcome_name
        );
        Ok(rows)
    }

    /// Cross-tabulate the outcome against each stratifier, concatenated in
    /// the given order
    pub fn crosstab_all(&self, stratifiers: &[&str]) -> Result<Vec<CrosstabRow>> {
        let mut rows = Vec::new();
        for stratifier in stratifiers {
            rows.extend(self.crosstab(stratifier)?);
        }
        Ok(rows)
    }
}
