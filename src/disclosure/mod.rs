//! Small-number suppression.
//!
//! Any primary count in the protected range is suppressed together with
//! every statistic sharing its row, so no published rate or share permits
//! back-calculation of a suppressed count against a known denominator.
//! The protected range is a constant; nothing in the crate can lower it.

use serde::Serialize;

use crate::aggregate::{CodeFrequencyRow, CrosstabRow};
use crate::error::{Result, StudyError};

/// Smallest protected count
pub const PROTECTED_MIN: u64 = 1;
/// Largest protected count
pub const PROTECTED_MAX: u64 = 5;

/// Whether a count falls in the protected small-number range
#[must_use]
pub const fn is_protected(count: u64) -> bool {
    PROTECTED_MIN <= count && count <= PROTECTED_MAX
}

/// A cross-tabulation row after disclosure control; `None` is the missing
/// marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedactedCrosstabRow {
    /// Stratifying variable
    pub attribute: String,
    /// Category within the stratifier
    pub category: String,
    /// Stratum members without the outcome
    pub without_outcome: Option<u64>,
    /// Stratum members with the outcome
    pub with_outcome: Option<u64>,
    /// Outcome rate per 100,000 stratum members
    pub rate_per_100k: Option<f64>,
    /// Stratum share of all positive outcomes
    pub percentage: Option<f64>,
}

impl From<CrosstabRow> for RedactedCrosstabRow {
    fn from(row: CrosstabRow) -> Self {
        Self {
            attribute: row.attribute,
            category: row.category,
            without_outcome: Some(row.without_outcome),
            with_outcome: Some(row.with_outcome),
            rate_per_100k: Some(row.rate_per_100k),
            percentage: Some(row.percentage),
        }
    }
}

impl RedactedCrosstabRow {
    /// Whether a count still present in the row is protected.
    ///
    /// Both counts trigger: a protected non-outcome count would otherwise
    /// be recoverable from the surviving rate and the outcome count.
    #[must_use]
    pub fn qualifies_for_suppression(&self) -> bool {
        self.with_outcome.is_some_and(is_protected)
            || self.without_outcome.is_some_and(is_protected)
    }

    /// Whether every statistic in the row is the missing marker
    #[must_use]
    pub const fn is_fully_suppressed(&self) -> bool {
        self.without_outcome.is_none()
            && self.with_outcome.is_none()
            && self.rate_per_100k.is_none()
            && self.percentage.is_none()
    }

    fn suppress(&mut self) {
        self.without_outcome = None;
        self.with_outcome = None;
        self.rate_per_100k = None;
        self.percentage = None;
    }
}

/// A code-frequency row after disclosure control
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedactedCodeRow {
    /// The clinical code
    pub code: String,
    /// Display term mapped to the code, if any
    pub term: Option<String>,
    /// Total matching event records
    pub total_records: Option<u64>,
    /// Share of all records across the set's codes
    pub percentage: Option<f64>,
}

impl From<CodeFrequencyRow> for RedactedCodeRow {
    fn from(row: CodeFrequencyRow) -> Self {
        Self {
            code: row.code,
            term: row.term,
            total_records: Some(row.total_records),
            percentage: Some(row.percentage),
        }
    }
}

impl RedactedCodeRow {
    fn qualifies_for_suppression(&self) -> bool {
        self.total_records.is_some_and(is_protected)
    }

    fn suppress(&mut self) {
        self.total_records = None;
        self.percentage = None;
    }
}

/// Applies and verifies row-wide small-number suppression
#[derive(Debug)]
pub struct DisclosureFilter;

impl DisclosureFilter {
    /// Redact a cross-tabulation. Idempotent: already-suppressed rows are
    /// untouched and surviving counts are outside the protected range.
    #[must_use]
    pub fn redact_crosstab(rows: Vec<CrosstabRow>) -> Vec<RedactedCrosstabRow> {
        Self::redact_crosstab_rows(rows.into_iter().map(Into::into).collect())
    }

    /// Redact rows that may already carry missing markers
    #[must_use]
    pub fn redact_crosstab_rows(
        mut rows: Vec<RedactedCrosstabRow>,
    ) -> Vec<RedactedCrosstabRow> {
        for row in &mut rows {
            if row.qualifies_for_suppression() {
                row.suppress();
            }
        }
        rows
    }

    /// Redact a code-frequency breakdown
    #[must_use]
    pub fn redact_code_frequency(rows: Vec<CodeFrequencyRow>) -> Vec<RedactedCodeRow> {
        Self::redact_code_rows(rows.into_iter().map(Into::into).collect())
    }

    /// Redact code rows that may already carry missing markers
    #[must_use]
    pub fn redact_code_rows(mut rows: Vec<RedactedCodeRow>) -> Vec<RedactedCodeRow> {
        for row in &mut rows {
            if row.qualifies_for_suppression() {
                row.suppress();
            }
        }
        rows
    }

    /// Check that no cross-tabulation row escaped suppression.
    ///
    /// A row with a surviving protected count, or a partially suppressed
    /// row, is a disclosure violation; the run must abort rather than emit.
    pub fn verify_crosstab(rows: &[RedactedCrosstabRow]) -> Result<()> {
        for row in rows {
            if row.qualifies_for_suppression() {
                return Err(StudyError::Disclosure(format!(
                    "protected count survived redaction in {}/{}",
                    row.attribute, row.category
                )));
            }
            let missing = [
                row.without_outcome.is_none(),
                row.with_outcome.is_none(),
                row.rate_per_100k.is_none(),
                row.percentage.is_none(),
            ];
            if missing.iter().any(|&m| m) && !row.is_fully_suppressed() {
                return Err(StudyError::Disclosure(format!(
                    "partially suppressed row {}/{}",
                    row.attribute, row.category
                )));
            }
        }
        Ok(())
    }

    /// Check that no code row escaped suppression
    pub fn verify_code_frequency(rows: &[RedactedCodeRow]) -> Result<()> {
        for row in rows {
            if row.qualifies_for_suppression() {
                return Err(StudyError::Disclosure(format!(
                    "protected count survived redaction for code {}",
                    row.code
                )));
            }
            if row.total_records.is_none() != row.percentage.is_none() {
                return Err(StudyError::Disclosure(format!(
                    "partially suppressed row for code {}",
                    row.code
                )));
            }
        }
        Ok(())
    }

    /// Check a masked series: no surviving bucket count may be protected
    pub fn verify_masked_counts<I>(counts: I, context: &str) -> Result<()>
    where
        I: IntoIterator<Item = Option<u64>>,
    {
        for count in counts {
            if count.is_some_and(is_protected) {
                return Err(StudyError::Disclosure(format!(
                    "protected count survived masking in {context}"
                )));
            }
        }
        Ok(())
    }
}
