//! One-pass assembly of the post-redaction reporting artifacts.
//!
//! A report either builds completely, with every artifact redacted and
//! re-verified, or fails before anything is handed back. There is no
//! partially redacted output state.

use serde::Serialize;

use crate::aggregate::{
    code_frequency, practice_distribution, practice_outcome_counts, practice_summary,
    Aggregator, PracticeDistribution, PracticeSummary,
};
use crate::codeset::CodeSet;
use crate::cohort::Cohort;
use crate::config::{DisplayLabels, StudyConfig};
use crate::disclosure::{DisclosureFilter, RedactedCodeRow, RedactedCrosstabRow};
use crate::error::Result;
use crate::events::EventTable;
use crate::timeseries::{Redaction, RedactedWeekBucket, TimeSeriesResampler};

/// A weekly series for one date variable
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySeries {
    /// The cohort date variable the series was resampled from
    pub variable: String,
    /// Redacted week buckets in chronological order
    pub buckets: Vec<RedactedWeekBucket>,
}

/// The full set of disclosure-controlled reporting artifacts for one run
#[derive(Debug, Clone, Serialize)]
pub struct StudyReport {
    /// Stratified counts and rates, all stratifiers concatenated
    pub counts_table: Vec<RedactedCrosstabRow>,
    /// Per-code usage breakdown, when a code set was supplied
    pub code_frequency: Vec<RedactedCodeRow>,
    /// Weekly event-count series per requested date variable
    pub weekly_series: Vec<WeeklySeries>,
    /// Histogram of per-practice outcome counts
    pub practice_distribution: PracticeDistribution,
    /// Practice coding summary
    pub practice_summary: PracticeSummary,
}

impl StudyReport {
    /// Serialise the artifacts as pretty-printed JSON; suppressed cells
    /// appear as `null`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for a [`StudyReport`]
#[derive(Debug)]
pub struct StudyReportBuilder<'a> {
    cohort: &'a Cohort,
    events: &'a EventTable,
    outcome: String,
    config: StudyConfig,
    labels: DisplayLabels,
    stratifiers: Vec<String>,
    code_breakdown: Option<&'a CodeSet>,
    series: Vec<(String, Redaction)>,
}

impl<'a> StudyReportBuilder<'a> {
    /// Start a report over a derived cohort and its event snapshot
    #[must_use]
    pub fn new(cohort: &'a Cohort, events: &'a EventTable, outcome: &str) -> Self {
        Self {
            cohort,
            events,
            outcome: outcome.to_string(),
            config: StudyConfig::default(),
            labels: DisplayLabels::new(),
            stratifiers: Vec::new(),
            code_breakdown: None,
            series: Vec::new(),
        }
    }

    /// Set the run configuration
    #[must_use]
    pub fn with_config(mut self, config: StudyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set display renaming for the counts table
    #[must_use]
    pub fn with_labels(mut self, labels: DisplayLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Stratify the outcome by these cohort variables, in order
    #[must_use]
    pub fn with_stratifiers(mut self, stratifiers: &[&str]) -> Self {
        self.stratifiers = stratifiers.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Include a per-code breakdown over this code set
    #[must_use]
    pub fn with_code_breakdown(mut self, codes: &'a CodeSet) -> Self {
        self.code_breakdown = Some(codes);
        self
    }

    /// Resample this cohort date variable into a weekly series
    #[must_use]
    pub fn with_weekly_series(mut self, variable: &str, redaction: Redaction) -> Self {
        self.series.push((variable.to_string(), redaction));
        self
    }

    /// Build all artifacts, redact, and re-verify.
    ///
    /// Any disclosure verification failure aborts the whole build; no
    /// artifact is returned in that case.
    pub fn build(self) -> Result<StudyReport> {
        log::info!("Building study report for outcome `{}`", self.outcome);
        log::debug!("{}", self.config);

        let aggregator = Aggregator::new(self.cohort, &self.outcome)?;
        let stratifiers: Vec<&str> = self.stratifiers.iter().map(String::as_str).collect();
        let crosstab = aggregator.crosstab_all(&stratifiers)?;
        let counts_table: Vec<RedactedCrosstabRow> =
            DisclosureFilter::redact_crosstab(crosstab)
                .into_iter()
                .map(|row| self.rename(row))
                .collect();
        DisclosureFilter::verify_crosstab(&counts_table)?;
        log::info!(
            "Counts table: {} rows across {} stratifiers",
            counts_table.len(),
            stratifiers.len()
        );

        let code_rows = match self.code_breakdown {
            Some(codes) => {
                let rows = DisclosureFilter::redact_code_frequency(code_frequency(
                    self.events,
                    codes,
                ));
                DisclosureFilter::verify_code_frequency(&rows)?;
                rows
            }
            None => Vec::new(),
        };

        let resampler =
            TimeSeriesResampler::new(self.config.report_start, self.config.report_end)?;
        let mut weekly_series = Vec::with_capacity(self.series.len());
        for (variable, redaction) in &self.series {
            let dates = self.cohort.date_column(variable)?.into_iter().flatten();
            let buckets = resampler.weekly_counts(dates);
            let redacted = TimeSeriesResampler::redact(&buckets, *redaction);
            if *redaction == Redaction::mask() {
                DisclosureFilter::verify_masked_counts(
                    redacted.iter().map(|b| b.count),
                    variable,
                )?;
            }
            weekly_series.push(WeeklySeries {
                variable: variable.clone(),
                buckets: redacted,
            });
        }

        let per_practice = practice_outcome_counts(self.cohort, &self.outcome)?;
        let report = StudyReport {
            counts_table,
            code_frequency: code_rows,
            weekly_series,
            practice_distribution: practice_distribution(&per_practice),
            practice_summary: practice_summary(&per_practice),
        };
        log::info!("Study report complete");
        Ok(report)
    }

    /// Apply display renaming after redaction; renaming never affects
    /// which rows were suppressed
    fn rename(&self, row: RedactedCrosstabRow) -> RedactedCrosstabRow {
        RedactedCrosstabRow {
            category: self.labels.category(&row.attribute, &row.category),
            attribute: self.labels.attribute(&row.attribute),
            ..row
        }
    }
}
