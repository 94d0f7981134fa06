//! The tagged value type for derived cohort variables.

use chrono::NaiveDate;
use serde::Serialize;

/// One cell of the wide cohort table.
///
/// Every population member gets exactly one value per variable; missing
/// data is carried explicitly inside the cell (`Date(None)`, a default
/// category label) rather than as an absent entry, so downstream redaction
/// can treat all cells uniformly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VariableValue {
    /// Boolean flag
    Bool(bool),
    /// Categorical label
    Category(String),
    /// Event date, `None` when no event matched
    Date(Option<NaiveDate>),
    /// Numeric measurement, `None` when no value was recorded
    Numeric(Option<f64>),
    /// Per-patient event count
    Count(u32),
}

impl VariableValue {
    /// The boolean carried by a flag value
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The label carried by a categorical value
    #[must_use]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Category(label) => Some(label),
            _ => None,
        }
    }

    /// The date carried by a date value, if one matched
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => *d,
            _ => None,
        }
    }

    /// Numeric view of the value, used by comparison predicates.
    ///
    /// Counts compare as numbers; flags and categories have no numeric view.
    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => *v,
            Self::Count(c) => Some(f64::from(*c)),
            _ => None,
        }
    }

    /// Truth view of the value, used by bare variable references.
    ///
    /// A count is true when non-zero; dates and numerics are true when
    /// present; categories have no truth view.
    #[must_use]
    pub const fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Count(c) => *c > 0,
            Self::Date(d) => d.is_some(),
            Self::Numeric(v) => v.is_some(),
            Self::Category(_) => false,
        }
    }
}
