//! Error handling for the cohort study pipeline.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::CodingSystem;

/// Broad error classes with distinct propagation policies.
///
/// Configuration errors are fatal at build time, data errors are absorbed
/// into rule defaults at the point of occurrence, and disclosure and emit
/// errors abort a run before any artifact is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid study definition (cyclic rules, bad code set combination)
    Configuration,
    /// Malformed input field from the event store
    Data,
    /// A statistic escaped redaction despite qualifying for suppression
    Disclosure,
    /// Report artifacts could not be written out
    Emit,
}

/// Specialized error type for cohort derivation and reporting
#[derive(Debug, Error)]
pub enum StudyError {
    /// The rule dependency graph contains a cycle
    #[error("cyclic rule dependency: {0}")]
    CyclicDependency(String),
    /// A rule references a name that is neither an input nor a rule
    #[error("unknown variable `{0}` referenced by a rule")]
    UnknownVariable(String),
    /// Two inputs or rules share a name
    #[error("duplicate definition of variable `{0}`")]
    DuplicateVariable(String),
    /// Code sets with different coding systems were combined without an override
    #[error("cannot combine code sets across coding systems ({left} and {right}) without an explicit system override")]
    MixedCodingSystems {
        /// System of the first set in the combination
        left: CodingSystem,
        /// The conflicting system
        right: CodingSystem,
    },
    /// A combination request contained no code sets
    #[error("cannot combine an empty collection of code sets")]
    EmptyCombination,
    /// A coding system name could not be recognised
    #[error("unknown coding system `{0}`")]
    UnknownCodingSystem(String),
    /// An input field could not be parsed as its declared type
    #[error("malformed {field} value `{value}`")]
    MalformedField {
        /// Name of the offending field
        field: &'static str,
        /// The raw value as received
        value: String,
    },
    /// A reporting window with start after end
    #[error("invalid reporting window: start {start} is after end {end}")]
    InvalidWindow {
        /// Window start
        start: NaiveDate,
        /// Window end
        end: NaiveDate,
    },
    /// A variable exists but has the wrong kind for the requested use
    #[error("variable `{name}` is not usable as {expected}")]
    VariableKind {
        /// The variable name
        name: String,
        /// What the caller needed it to be
        expected: &'static str,
    },
    /// A statistic qualifying for suppression survived redaction
    #[error("disclosure violation: {0}")]
    Disclosure(String),
    /// Report artifacts could not be serialised
    #[error("failed to serialise report artifacts: {0}")]
    Serialise(#[from] serde_json::Error),
}

impl StudyError {
    /// Classify this error for propagation decisions
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CyclicDependency(_)
            | Self::UnknownVariable(_)
            | Self::DuplicateVariable(_)
            | Self::MixedCodingSystems { .. }
            | Self::EmptyCombination
            | Self::UnknownCodingSystem(_)
            | Self::InvalidWindow { .. }
            | Self::VariableKind { .. } => ErrorKind::Configuration,
            Self::MalformedField { .. } => ErrorKind::Data,
            Self::Disclosure(_) => ErrorKind::Disclosure,
            Self::Serialise(_) => ErrorKind::Emit,
        }
    }
}

/// Result type for study pipeline operations
pub type Result<T> = std::result::Result<T, StudyError>;
