//! A queryable, immutable view over a population's clinical events.
//!
//! `EventTable` supports a small algebra of pure, chainable operations:
//! restriction (`filter`, `with_codes`, `date_in_range`) returns a narrower
//! view over the same shared snapshot, and extraction (`exists`, `count`,
//! `earliest`, `latest`) produces total per-patient columns.

pub mod columns;

use std::sync::Arc;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::codeset::CodeSet;
use crate::models::{ClinicalEvent, PatientId, RawEvent};

pub use columns::PatientColumn;

/// Read-only snapshot of clinical events for one run.
///
/// Restriction operations share the underlying event slice and only narrow
/// the selection, so chaining never copies events. Selection order is the
/// event-store insertion order, which doubles as the deterministic
/// tie-break key for `earliest`/`latest`.
#[derive(Debug, Clone)]
pub struct EventTable {
    events: Arc<[ClinicalEvent]>,
    selected: Vec<u32>,
}

impl EventTable {
    /// Build a table from typed events, preserving their order
    #[must_use]
    pub fn from_events(events: Vec<ClinicalEvent>) -> Self {
        let selected = (0..events.len() as u32).collect();
        Self {
            events: events.into(),
            selected,
        }
    }

    /// Build a table from untyped event-store rows.
    ///
    /// Rows with malformed fields are logged and skipped; a bad row affects
    /// only the variables that would have matched it, which resolve to
    /// their rule defaults downstream.
    #[must_use]
    pub fn from_raw(rows: Vec<RawEvent>) -> Self {
        let mut events = Vec::with_capacity(rows.len());
        let mut dropped = 0usize;
        for row in rows {
            match ClinicalEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    log::warn!("dropping malformed event row: {e}");
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            log::warn!("dropped {dropped} malformed event rows");
        }
        Self::from_events(events)
    }

    /// Number of events in the current selection
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether the current selection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Iterate the selected events in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ClinicalEvent> {
        self.selected.iter().map(|&i| &self.events[i as usize])
    }

    /// Restrict to events matching an arbitrary predicate
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&ClinicalEvent) -> bool,
    {
        let selected = self
            .selected
            .iter()
            .copied()
            .filter(|&i| predicate(&self.events[i as usize]))
            .collect();
        Self {
            events: Arc::clone(&self.events),
            selected,
        }
    }

    /// Restrict to events whose code and system match the set
    #[must_use]
    pub fn with_codes(&self, codes: &CodeSet) -> Self {
        self.filter(|e| codes.matches(e))
    }

    /// Restrict to events dated within `[start, end]` inclusive
    #[must_use]
    pub fn date_in_range(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filter(|e| start <= e.date && e.date <= end)
    }

    /// Restrict to events dated on or before the given date
    #[must_use]
    pub fn on_or_before(&self, date: NaiveDate) -> Self {
        self.filter(|e| e.date <= date)
    }

    /// Restrict to events dated on or after the given date
    #[must_use]
    pub fn on_or_after(&self, date: NaiveDate) -> Self {
        self.filter(|e| e.date >= date)
    }

    /// Per-patient flag: at least one selected event
    #[must_use]
    pub fn exists(&self) -> PatientColumn<bool> {
        let mut values = FxHashMap::default();
        for event in self.iter() {
            values.insert(event.patient_id, true);
        }
        PatientColumn::from_map(values)
    }

    /// Per-patient count of selected events
    #[must_use]
    pub fn count(&self) -> PatientColumn<u32> {
        let mut values: FxHashMap<PatientId, u32> = FxHashMap::default();
        for event in self.iter() {
            *values.entry(event.patient_id).or_insert(0) += 1;
        }
        PatientColumn::from_map(values)
    }

    /// Per-patient earliest selected event.
    ///
    /// Ties on the date are broken towards the earliest-inserted event.
    #[must_use]
    pub fn earliest(&self) -> SelectedEvents {
        let mut chosen: FxHashMap<PatientId, u32> = FxHashMap::default();
        for &i in &self.selected {
            let event = &self.events[i as usize];
            chosen
                .entry(event.patient_id)
                .and_modify(|best| {
                    // strict: an equal date keeps the earlier insertion
                    if event.date < self.events[*best as usize].date {
                        *best = i;
                    }
                })
                .or_insert(i);
        }
        SelectedEvents {
            events: Arc::clone(&self.events),
            chosen,
        }
    }

    /// Per-patient latest selected event.
    ///
    /// Ties on the date are broken towards the latest-inserted event.
    #[must_use]
    pub fn latest(&self) -> SelectedEvents {
        let mut chosen: FxHashMap<PatientId, u32> = FxHashMap::default();
        for &i in &self.selected {
            let event = &self.events[i as usize];
            chosen
                .entry(event.patient_id)
                .and_modify(|best| {
                    // inclusive: an equal date moves to the later insertion
                    if event.date >= self.events[*best as usize].date {
                        *best = i;
                    }
                })
                .or_insert(i);
        }
        SelectedEvents {
            events: Arc::clone(&self.events),
            chosen,
        }
    }
}

/// One selected event per patient, ready for scalar extraction
#[derive(Debug, Clone)]
pub struct SelectedEvents {
    events: Arc<[ClinicalEvent]>,
    chosen: FxHashMap<PatientId, u32>,
}

impl SelectedEvents {
    fn extract<T, F>(&self, f: F) -> PatientColumn<T>
    where
        F: Fn(&ClinicalEvent) -> Option<T>,
    {
        let mut values = FxHashMap::default();
        for (&patient, &i) in &self.chosen {
            if let Some(value) = f(&self.events[i as usize]) {
                values.insert(patient, value);
            }
        }
        PatientColumn::from_map(values)
    }

    /// Date of the selected event
    #[must_use]
    pub fn date(&self) -> PatientColumn<NaiveDate> {
        self.extract(|e| Some(e.date))
    }

    /// Numeric payload of the selected event, where recorded
    #[must_use]
    pub fn numeric_value(&self) -> PatientColumn<f64> {
        self.extract(|e| e.numeric_value)
    }

    /// Code recorded on the selected event
    #[must_use]
    pub fn code(&self) -> PatientColumn<String> {
        self.extract(|e| Some(e.code.clone()))
    }

    /// Display category the selected event's code maps to in the set
    #[must_use]
    pub fn category(&self, codes: &CodeSet) -> PatientColumn<String> {
        self.extract(|e| codes.term(&e.code).map(str::to_string))
    }
}
