//! Weekly event-count series with trend-safe redaction.

use chrono::{Datelike, Days, NaiveDate};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::disclosure::{is_protected, PROTECTED_MAX};
use crate::error::{Result, StudyError};

/// One calendar-week bucket, pre-redaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekBucket {
    /// The Sunday the week ends on
    pub week_ending: NaiveDate,
    /// Events dated within the week
    pub count: u64,
}

/// One calendar-week bucket after redaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RedactedWeekBucket {
    /// The Sunday the week ends on
    pub week_ending: NaiveDate,
    /// Masked or rounded count; `None` is the missing marker
    pub count: Option<u64>,
}

/// Redaction strategy for a published series.
///
/// Constructed through [`Redaction::mask`] and [`Redaction::round`] so the
/// rounding base can never drop below the protected-range ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redaction(RedactionKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedactionKind {
    Mask,
    Round(u64),
}

impl Redaction {
    /// Mask protected counts entirely; zero counts stay visible.
    ///
    /// Used for externally published, low-volume series.
    #[must_use]
    pub const fn mask() -> Self {
        Self(RedactionKind::Mask)
    }

    /// Round every count to the nearest multiple of `base`, halves up.
    ///
    /// Preserves trend shape at coarser disclosure risk than masking. The
    /// base is clamped to the protected-range ceiling so a small base
    /// cannot reintroduce protected values.
    #[must_use]
    pub const fn round(base: u64) -> Self {
        let base = if base < PROTECTED_MAX {
            PROTECTED_MAX
        } else {
            base
        };
        Self(RedactionKind::Round(base))
    }
}

/// Buckets dated events into fixed weekly windows within a reporting range
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesResampler {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeSeriesResampler {
    /// A resampler over the inclusive reporting window `[start, end]`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StudyError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The Sunday on or after the date (the week label)
    #[must_use]
    pub fn week_ending(date: NaiveDate) -> NaiveDate {
        let offset = 6 - u64::from(date.weekday().num_days_from_monday());
        date.checked_add_days(Days::new(offset)).unwrap_or(date)
    }

    /// Count events per calendar week.
    ///
    /// Dates outside the window are ignored; every week whose label falls
    /// in the window appears, empty ones with count zero, so the bucket
    /// sum equals the number of in-window dates.
    #[must_use]
    pub fn weekly_counts<I>(&self, dates: I) -> Vec<WeekBucket>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut counts: FxHashMap<NaiveDate, u64> = FxHashMap::default();
        for date in dates {
            if self.start <= date && date <= self.end {
                *counts.entry(Self::week_ending(date)).or_insert(0) += 1;
            }
        }

        let mut buckets = Vec::new();
        let mut week = Self::week_ending(self.start);
        let last = Self::week_ending(self.end);
        while week <= last {
            buckets.push(WeekBucket {
                week_ending: week,
                count: counts.get(&week).copied().unwrap_or(0),
            });
            week = match week.checked_add_days(Days::new(7)) {
                Some(next) => next,
                None => break,
            };
        }
        buckets
    }

    /// Apply a redaction strategy to a bucketed series
    #[must_use]
    pub fn redact(buckets: &[WeekBucket], strategy: Redaction) -> Vec<RedactedWeekBucket> {
        buckets
            .iter()
            .map(|bucket| {
                let count = match strategy.0 {
                    RedactionKind::Mask => {
                        if is_protected(bucket.count) {
                            None
                        } else {
                            Some(bucket.count)
                        }
                    }
                    RedactionKind::Round(base) => Some(round_to_base(bucket.count, base)),
                };
                RedactedWeekBucket {
                    week_ending: bucket.week_ending,
                    count,
                }
            })
            .collect()
    }
}

/// Round to the nearest multiple of `base`, halves up
#[must_use]
pub fn round_to_base(count: u64, base: u64) -> u64 {
    if base <= 1 {
        return count;
    }
    (count + base / 2) / base * base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weeks_end_on_sunday() {
        // 2020-11-02 is a Monday, 2020-11-08 a Sunday
        assert_eq!(TimeSeriesResampler::week_ending(date(2020, 11, 2)), date(2020, 11, 8));
        assert_eq!(TimeSeriesResampler::week_ending(date(2020, 11, 8)), date(2020, 11, 8));
    }

    #[test]
    fn conservation_of_in_window_counts() {
        let resampler =
            TimeSeriesResampler::new(date(2020, 1, 1), date(2020, 2, 29)).unwrap();
        let dates = vec![
            date(2020, 1, 1),
            date(2020, 1, 2),
            date(2020, 1, 20),
            date(2020, 2, 29),
            date(2019, 12, 31), // outside, ignored
            date(2020, 3, 1),   // outside, ignored
        ];
        let buckets = resampler.weekly_counts(dates);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 4);
        // every week of the window is present, empty ones at zero
        assert_eq!(buckets.len(), 9);
        assert!(buckets.iter().any(|b| b.count == 0));
    }

    #[test]
    fn masking_hides_protected_counts_only() {
        let buckets = [
            WeekBucket { week_ending: date(2020, 1, 5), count: 0 },
            WeekBucket { week_ending: date(2020, 1, 12), count: 3 },
            WeekBucket { week_ending: date(2020, 1, 19), count: 6 },
        ];
        let masked = TimeSeriesResampler::redact(&buckets, Redaction::mask());
        assert_eq!(masked[0].count, Some(0));
        assert_eq!(masked[1].count, None);
        assert_eq!(masked[2].count, Some(6));
    }

    #[test]
    fn rounding_is_half_up_to_the_base() {
        let buckets: Vec<WeekBucket> = [3u64, 7, 12]
            .iter()
            .enumerate()
            .map(|(i, &count)| WeekBucket {
                week_ending: date(2020, 1, 5 + 7 * i as u32),
                count,
            })
            .collect();
        let rounded = TimeSeriesResampler::redact(&buckets, Redaction::round(5));
        let counts: Vec<_> = rounded.iter().map(|b| b.count.unwrap()).collect();
        assert_eq!(counts, vec![5, 5, 10]);
        // the rounded sum legitimately differs from the raw sum
        assert_ne!(counts.iter().sum::<u64>(), 22);
    }

    #[test]
    fn rounding_base_cannot_undercut_the_protected_range() {
        let buckets = [WeekBucket { week_ending: date(2020, 1, 5), count: 2 }];
        let rounded = TimeSeriesResampler::redact(&buckets, Redaction::round(1));
        // clamped to base 5: 2 rounds away from its exact value
        assert_eq!(rounded[0].count, Some(0));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = TimeSeriesResampler::new(date(2021, 1, 1), date(2020, 1, 1)).unwrap_err();
        assert!(matches!(err, StudyError::InvalidWindow { .. }));
    }
}
