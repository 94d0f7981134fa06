//! Per-patient demographic attributes.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::event::PatientId;

/// Recorded sex of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// Male
    Male,
    /// Female
    Female,
    /// Unknown or not recorded
    Unknown,
}

impl Sex {
    /// Category label used in cohort tables
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "missing",
        }
    }

    /// Whether the sex is recorded as male or female
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<&str> for Sex {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "1" => Self::Male,
            "f" | "female" | "2" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

/// One interval of registration with a practice.
///
/// Open-ended intervals use `None` at the missing end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInterval {
    /// First day of registration, if known
    pub start: Option<NaiveDate>,
    /// Last day of registration; `None` means still registered
    pub end: Option<NaiveDate>,
}

impl RegistrationInterval {
    /// Whether the interval covers the given date (inclusive at both ends)
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| s <= date) && self.end.is_none_or(|e| date <= e)
    }
}

/// Demographic attributes for one population member.
///
/// Optional fields are genuinely missing data; derivation rules resolve
/// them to their declared defaults rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAttributes {
    /// Patient identifier
    pub patient_id: PatientId,
    /// Recorded sex
    pub sex: Sex,
    /// Date of birth, if parseable
    pub date_of_birth: Option<NaiveDate>,
    /// Region of the registered practice
    pub region: Option<String>,
    /// Area-level index of multiple deprivation, full precision
    pub deprivation_index: Option<u32>,
    /// Registered practice
    pub practice_id: Option<u32>,
    /// Practice registration history
    pub registrations: Vec<RegistrationInterval>,
}

impl PatientAttributes {
    /// Age in whole years at the given date, when the birth date is known
    #[must_use]
    pub fn age_at(&self, date: NaiveDate) -> Option<i32> {
        let dob = self.date_of_birth?;
        let mut age = date.year() - dob.year();
        if (date.month(), date.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        Some(age)
    }

    /// Whether the patient was registered with a practice at the given date
    #[must_use]
    pub fn registered_at(&self, date: NaiveDate) -> bool {
        self.registrations.iter().any(|r| r.covers(date))
    }
}
