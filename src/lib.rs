//! A Rust library for deriving per-patient cohort variables from
//! time-stamped clinical events and producing disclosure-controlled,
//! stratified summary statistics and time series.

pub mod aggregate;
pub mod codeset;
pub mod cohort;
pub mod config;
pub mod disclosure;
pub mod error;
pub mod events;
pub mod models;
pub mod report;
pub mod rules;
pub mod timeseries;

// Re-export the most common types for easier use
// Core types
pub use codeset::CodeSet;
pub use config::{DisplayLabels, StudyConfig};
pub use error::{ErrorKind, Result, StudyError};
pub use events::{EventTable, PatientColumn};
pub use models::{ClinicalEvent, CodingSystem, PatientAttributes, PatientId, RawEvent, Sex, VariableValue};

// Rule definition and evaluation
pub use rules::{var, DateWindow, InputSource, Predicate, RuleSet, VariableRule};

// Cohort construction
pub use cohort::{Cohort, CohortBuilder, PopulationCriteria};

// Aggregation and disclosure control
pub use aggregate::{Aggregator, CrosstabRow};
pub use disclosure::{DisclosureFilter, RedactedCrosstabRow};
pub use report::{StudyReport, StudyReportBuilder};
pub use timeseries::{Redaction, TimeSeriesResampler, WeekBucket};
