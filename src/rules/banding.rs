//! Fixed-threshold numeric banding.
//!
//! Bands use configured constant thresholds rather than data-driven
//! quantiles, so identical raw values map to identical bands across
//! cohorts and re-runs. The deprivation index is additionally rounded to a
//! coarse granularity before it reaches any threshold comparison.

use super::expr::{var, Predicate};

/// Population-scale denominator for deprivation quintiles (ranked English
/// small areas)
pub const DEPRIVATION_SCALE: u32 = 32_844;

/// Granularity the deprivation index is rounded to before banding
pub const DEPRIVATION_ROUNDING: u32 = 100;

/// Round to the nearest multiple of `granularity`, halves up
#[must_use]
pub fn round_to_nearest(value: u32, granularity: u32) -> u32 {
    if granularity <= 1 {
        return value;
    }
    (value + granularity / 2) / granularity * granularity
}

/// Half-open band `[lower, upper)` arms over a named numeric input.
///
/// `None` leaves the corresponding side unbounded. Arms come back in the
/// given order, ready for [`VariableRule::categorise`].
///
/// [`VariableRule::categorise`]: super::VariableRule::categorise
#[must_use]
pub fn banded_arms(
    input: &str,
    bands: &[(&str, Option<f64>, Option<f64>)],
) -> Vec<(String, Predicate)> {
    bands
        .iter()
        .map(|(label, lower, upper)| {
            let predicate = match (lower, upper) {
                (Some(lo), Some(hi)) => var(input).ge(*lo).and(var(input).lt(*hi)),
                (Some(lo), None) => var(input).ge(*lo),
                (None, Some(hi)) => var(input).lt(*hi),
                (None, None) => Predicate::True,
            };
            ((*label).to_string(), predicate)
        })
        .collect()
}

/// Quintile arms `"1"` (most deprived) to `"5"` (least deprived) over a
/// named deprivation-index input.
///
/// Thresholds are fixed fractions of `scale`; a value of exactly `scale`
/// or above falls through to the rule's default.
#[must_use]
pub fn deprivation_quintile_arms(input: &str, scale: u32) -> Vec<(String, Predicate)> {
    let scale = f64::from(scale);
    (1..=5u32)
        .map(|q| {
            let lower = if q == 1 {
                1.0
            } else {
                scale * f64::from(q - 1) / 5.0
            };
            let upper = scale * f64::from(q) / 5.0;
            (
                q.to_string(),
                var(input).ge(lower).and(var(input).lt(upper)),
            )
        })
        .collect()
}
