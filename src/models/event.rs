//! Clinical event facts and their coding systems.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

/// Opaque patient identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientId(pub u64);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clinical coding system an event or code set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodingSystem {
    /// SNOMED CT concept identifiers
    Snomed,
    /// CTV3 (Read v3) codes
    Ctv3,
    /// ICD-10 diagnosis codes
    Icd10,
    /// dm+d medication codes
    Dmd,
}

impl CodingSystem {
    /// Canonical lower-case name of the system
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snomed => "snomed",
            Self::Ctv3 => "ctv3",
            Self::Icd10 => "icd10",
            Self::Dmd => "dmd",
        }
    }
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CodingSystem {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "snomed" | "snomedct" | "snomed_ct" => Ok(Self::Snomed),
            "ctv3" | "readv3" => Ok(Self::Ctv3),
            "icd10" | "icd-10" => Ok(Self::Icd10),
            "dmd" | "dm+d" => Ok(Self::Dmd),
            other => Err(StudyError::UnknownCodingSystem(other.to_string())),
        }
    }
}

/// One time-stamped clinical fact for one patient.
///
/// Events are immutable for the lifetime of a run; all derivation works on
/// read-only views over a snapshot of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEvent {
    /// Patient the event belongs to
    pub patient_id: PatientId,
    /// Clinical code recorded on the event
    pub code: String,
    /// Coding system the code belongs to
    pub system: CodingSystem,
    /// Date the event was recorded
    pub date: NaiveDate,
    /// Optional numeric payload (e.g. a BMI measurement)
    pub numeric_value: Option<f64>,
    /// Practice the event was recorded at, when known
    pub practice_id: Option<u32>,
}

/// Untyped event row as received from the event store.
///
/// Conversion to [`ClinicalEvent`] is where malformed fields surface; the
/// table constructor absorbs those rows per the data-error policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Patient the event belongs to
    pub patient_id: u64,
    /// Clinical code as recorded
    pub code: String,
    /// Coding system name as recorded
    pub system: String,
    /// Event date in `YYYY-MM-DD` form
    pub date: String,
    /// Optional numeric payload as recorded
    pub numeric_value: Option<String>,
    /// Practice the event was recorded at, when known
    pub practice_id: Option<u32>,
}

impl TryFrom<RawEvent> for ClinicalEvent {
    type Error = StudyError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let system = raw
            .system
            .parse::<CodingSystem>()
            .map_err(|_| StudyError::MalformedField {
                field: "system",
                value: raw.system.clone(),
            })?;
        let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").map_err(|_| {
            StudyError::MalformedField {
                field: "date",
                value: raw.date.clone(),
            }
        })?;
        let numeric_value = match &raw.numeric_value {
            None => None,
            Some(text) => Some(text.trim().parse::<f64>().map_err(|_| {
                StudyError::MalformedField {
                    field: "numeric_value",
                    value: text.clone(),
                }
            })?),
        };
        Ok(Self {
            patient_id: PatientId(raw.patient_id),
            code: raw.code,
            system,
            date,
            numeric_value,
            practice_id: raw.practice_id,
        })
    }
}
