//! Run configuration for a study.

use std::fmt;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cohort::PopulationCriteria;
use crate::rules::banding::{self, DEPRIVATION_SCALE};
use crate::rules::Predicate;
use crate::timeseries::Redaction;

/// Configuration for one cohort derivation and reporting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Index date the study is anchored to
    pub index_date: NaiveDate,
    /// First day of the trend reporting window
    pub report_start: NaiveDate,
    /// Last day of the trend reporting window
    pub report_end: NaiveDate,
    /// Population-scale denominator for deprivation banding
    pub deprivation_scale: u32,
    /// Base for the rounding redaction strategy
    pub rounding_base: u32,
}

impl StudyConfig {
    /// The standard population for this run: registered at the index date
    /// with a recorded sex
    #[must_use]
    pub fn index_population(&self) -> PopulationCriteria {
        PopulationCriteria::All(vec![
            PopulationCriteria::RegisteredAt(self.index_date),
            PopulationCriteria::KnownSex,
        ])
    }

    /// Quintile arms over a named deprivation-index input, banded against
    /// this run's population scale
    #[must_use]
    pub fn deprivation_quintiles(&self, input: &str) -> Vec<(String, Predicate)> {
        banding::deprivation_quintile_arms(input, self.deprivation_scale)
    }

    /// The rounding redaction strategy for published series, using this
    /// run's base
    #[must_use]
    pub fn series_rounding(&self) -> Redaction {
        Redaction::round(u64::from(self.rounding_base))
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            index_date: NaiveDate::from_ymd_opt(2020, 11, 2).unwrap(),
            report_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            report_end: NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
            deprivation_scale: DEPRIVATION_SCALE,
            rounding_base: 5,
        }
    }
}

impl fmt::Display for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Configuration:")?;
        writeln!(f, "  Index Date: {}", self.index_date)?;
        writeln!(
            f,
            "  Reporting Window: {} to {}",
            self.report_start, self.report_end
        )?;
        writeln!(f, "  Deprivation Scale: {}", self.deprivation_scale)?;
        writeln!(f, "  Rounding Base: {}", self.rounding_base)?;
        Ok(())
    }
}

/// Display renaming applied when formatting report tables.
///
/// An explicit configuration object passed into the formatting step, so no
/// process-wide rename state exists. Renaming happens after redaction and
/// never affects which rows are suppressed.
#[derive(Debug, Clone, Default)]
pub struct DisplayLabels {
    attributes: FxHashMap<String, String>,
    categories: FxHashMap<(String, String), String>,
}

impl DisplayLabels {
    /// An empty mapping (identity renaming)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename an attribute for display
    #[must_use]
    pub fn rename_attribute(mut self, from: &str, to: &str) -> Self {
        self.attributes.insert(from.to_string(), to.to_string());
        self
    }

    /// Rename one category of one attribute for display
    #[must_use]
    pub fn rename_category(mut self, attribute: &str, from: &str, to: &str) -> Self {
        self.categories
            .insert((attribute.to_string(), from.to_string()), to.to_string());
        self
    }

    /// Display form of an attribute name
    #[must_use]
    pub fn attribute(&self, name: &str) -> String {
        self.attributes
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Display form of a category under an attribute
    #[must_use]
    pub fn category(&self, attribute: &str, raw: &str) -> String {
        self.categories
            .get(&(attribute.to_string(), raw.to_string()))
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    /// Conventional renames for English reporting tables
    #[must_use]
    pub fn england_defaults() -> Self {
        Self::new()
            .rename_category("imd", "1", "Most deprived 1")
            .rename_category("imd", "5", "Least deprived 5")
            .rename_category("region", "East", "East of England")
            .rename_category("ethnicity", "1", "White")
            .rename_category("ethnicity", "2", "Mixed")
            .rename_category("ethnicity", "3", "South Asian")
            .rename_category("ethnicity", "4", "Black")
            .rename_category("ethnicity", "5", "Other")
    }
}
