//! Identified, deduplicated collections of clinical codes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};
use crate::models::{ClinicalEvent, CodingSystem};

/// A named, deduplicated set of clinical codes tied to one coding system.
///
/// Codes may carry a display term or category label. Sets are fixed before
/// a run starts; combination produces a new set rather than mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSet {
    name: String,
    system: CodingSystem,
    /// code -> optional display term; `BTreeMap` keeps iteration order
    /// deterministic for the code-frequency table
    codes: BTreeMap<String, Option<String>>,
}

impl CodeSet {
    /// Create a set from bare codes
    pub fn new<I, S>(name: &str, system: CodingSystem, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            system,
            codes: codes.into_iter().map(|c| (c.into(), None)).collect(),
        }
    }

    /// Create a set from `(code, display term)` pairs
    pub fn with_terms<I, S, T>(name: &str, system: CodingSystem, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.to_string(),
            system,
            codes: entries
                .into_iter()
                .map(|(c, t)| (c.into(), Some(t.into())))
                .collect(),
        }
    }

    /// Identifier of the set
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Coding system all codes in the set belong to
    #[must_use]
    pub const fn system(&self) -> CodingSystem {
        self.system
    }

    /// Number of distinct codes
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the set holds no codes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Whether the set contains the code
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    /// Codes in deterministic (lexicographic) order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    /// Display term mapped to the code, if any
    #[must_use]
    pub fn term(&self, code: &str) -> Option<&str> {
        self.codes.get(code).and_then(Option::as_deref)
    }

    /// Whether an event's code and system match this set
    #[must_use]
    pub fn matches(&self, event: &ClinicalEvent) -> bool {
        event.system == self.system && self.contains(&event.code)
    }

    /// Combine sets into their union.
    ///
    /// Codes are deduplicated; the first set defining a term for a code
    /// wins. All inputs must share one coding system; a mixed combination
    /// is a configuration error (use [`CodeSet::combine_as`] for a
    /// deliberate cross-system union).
    pub fn combine<'a, I>(name: &str, sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a CodeSet>,
    {
        let mut iter = sets.into_iter();
        let first = iter.next().ok_or(StudyError::EmptyCombination)?;
        let system = first.system;
        let mut combined = Self {
            name: name.to_string(),
            system,
            codes: BTreeMap::new(),
        };
        combined.merge(first);
        for set in iter {
            if set.system != system {
                return Err(StudyError::MixedCodingSystems {
                    left: system,
                    right: set.system,
                });
            }
            combined.merge(set);
        }
        Ok(combined)
    }

    /// Combine sets under an explicitly declared system, skipping the
    /// same-system check.
    ///
    /// Event matching still compares against the declared system, so this
    /// is only useful when the caller knows the inputs' code values share a
    /// namespace.
    pub fn combine_as<'a, I>(name: &str, system: CodingSystem, sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a CodeSet>,
    {
        let mut combined = Self {
            name: name.to_string(),
            system,
            codes: BTreeMap::new(),
        };
        let mut any = false;
        for set in sets {
            combined.merge(set);
            any = true;
        }
        if !any {
            return Err(StudyError::EmptyCombination);
        }
        Ok(combined)
    }

    fn merge(&mut self, other: &Self) {
        for (code, term) in &other.codes {
            self.codes
                .entry(code.clone())
                .and_modify(|existing| {
                    if existing.is_none() {
                        existing.clone_from(term);
                    }
                })
                .or_insert_with(|| term.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_unions_and_dedupes() {
        let left = CodeSet::new("left", CodingSystem::Snomed, ["A", "B"]);
        let right = CodeSet::new("right", CodingSystem::Snomed, ["B", "C"]);
        let combined = CodeSet::combine("both", [&left, &right]).unwrap();
        assert_eq!(combined.len(), 3);
        assert_eq!(combined.codes().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn first_seen_term_wins_on_collision() {
        let left = CodeSet::with_terms("left", CodingSystem::Snomed, [("B", "first term")]);
        let right = CodeSet::with_terms("right", CodingSystem::Snomed, [("B", "second term")]);
        let combined = CodeSet::combine("both", [&left, &right]).unwrap();
        assert_eq!(combined.term("B"), Some("first term"));
    }

    #[test]
    fn term_fills_in_from_later_set_when_first_has_none() {
        let left = CodeSet::new("left", CodingSystem::Snomed, ["B"]);
        let right = CodeSet::with_terms("right", CodingSystem::Snomed, [("B", "term")]);
        let combined = CodeSet::combine("both", [&left, &right]).unwrap();
        assert_eq!(combined.term("B"), Some("term"));
    }

    #[test]
    fn mixed_systems_are_rejected() {
        let snomed = CodeSet::new("s", CodingSystem::Snomed, ["A"]);
        let icd = CodeSet::new("i", CodingSystem::Icd10, ["U09"]);
        let err = CodeSet::combine("both", [&snomed, &icd]).unwrap_err();
        assert!(matches!(err, StudyError::MixedCodingSystems { .. }));
    }

    #[test]
    fn explicit_override_allows_cross_system_union() {
        let snomed = CodeSet::new("s", CodingSystem::Snomed, ["A"]);
        let icd = CodeSet::new("i", CodingSystem::Icd10, ["U09"]);
        let combined =
            CodeSet::combine_as("both", CodingSystem::Snomed, [&snomed, &icd]).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.system(), CodingSystem::Snomed);
    }

    #[test]
    fn empty_combination_is_an_error() {
        let err = CodeSet::combine("none", []).unwrap_err();
        assert!(matches!(err, StudyError::EmptyCombination));
    }
}
