//! Total per-patient result columns.

use rustc_hash::FxHashMap;

use crate::models::PatientId;

/// A per-patient column produced by an event-table extraction.
///
/// Columns are total: a patient absent from the underlying table simply has
/// no entry, and the typed getters turn that into the documented "no match"
/// value (false, zero, `None`) instead of an error.
#[derive(Debug, Clone, Default)]
pub struct PatientColumn<T> {
    values: FxHashMap<PatientId, T>,
}

impl<T> PatientColumn<T> {
    pub(crate) fn from_map(values: FxHashMap<PatientId, T>) -> Self {
        Self { values }
    }

    /// The stored value for a patient, if any
    #[must_use]
    pub fn get(&self, patient: PatientId) -> Option<&T> {
        self.values.get(&patient)
    }

    /// Number of patients with a stored value
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no patient has a stored value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(patient, value)` entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (PatientId, &T)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }
}

impl PatientColumn<bool> {
    /// Flag for the patient; absent patients are `false`
    #[must_use]
    pub fn flag(&self, patient: PatientId) -> bool {
        self.values.get(&patient).copied().unwrap_or(false)
    }
}

impl PatientColumn<u32> {
    /// Count for the patient; absent patients are zero
    #[must_use]
    pub fn count(&self, patient: PatientId) -> u32 {
        self.values.get(&patient).copied().unwrap_or(0)
    }
}
