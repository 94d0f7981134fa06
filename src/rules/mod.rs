//! Declarative derivation rules for per-patient variables.
//!
//! A study declares named *inputs* (columns extracted from the event table
//! or patient attributes) and *rules* (categorisations, flags, and value
//! pass-throughs over those inputs and over other rules). The rule
//! dependency graph is validated before any evaluation happens.

pub mod banding;
pub mod categoriser;
pub mod expr;
pub mod graph;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::codeset::CodeSet;
use crate::error::{Result, StudyError};
use crate::events::{EventTable, PatientColumn};
use crate::models::{PatientAttributes, PatientId, VariableValue};

pub use expr::{var, CmpOp, Predicate, VarBuilder};

/// Label assigned when a categorical pass-through has no recorded value
pub const MISSING_LABEL: &str = "missing";

/// Inclusive date restriction applied to an event query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    /// Earliest date included, if bounded
    pub start: Option<NaiveDate>,
    /// Latest date included, if bounded
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// No date restriction
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Events dated on or before `date`
    #[must_use]
    pub const fn on_or_before(date: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(date),
        }
    }

    /// Events dated on or after `date`
    #[must_use]
    pub const fn on_or_after(date: NaiveDate) -> Self {
        Self {
            start: Some(date),
            end: None,
        }
    }

    /// Events dated within `[start, end]`
    #[must_use]
    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub(crate) fn apply(&self, table: &EventTable) -> EventTable {
        match (self.start, self.end) {
            (Some(s), Some(e)) => table.date_in_range(s, e),
            (Some(s), None) => table.on_or_after(s),
            (None, Some(e)) => table.on_or_before(e),
            (None, None) => table.clone(),
        }
    }
}

/// How one named input column is derived
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Patient had at least one matching event in the window
    HasEvent {
        /// Codes that qualify an event
        codes: CodeSet,
        /// Date restriction
        window: DateWindow,
    },
    /// Number of matching events in the window
    EventCount {
        /// Codes that qualify an event
        codes: CodeSet,
        /// Date restriction
        window: DateWindow,
    },
    /// Date of the first matching event
    EarliestDate {
        /// Codes that qualify an event
        codes: CodeSet,
        /// Date restriction
        window: DateWindow,
    },
    /// Date of the last matching event
    LatestDate {
        /// Codes that qualify an event
        codes: CodeSet,
        /// Date restriction
        window: DateWindow,
    },
    /// Numeric value carried on the last matching event
    LatestValue {
        /// Codes that qualify an event
        codes: CodeSet,
        /// Date restriction
        window: DateWindow,
    },
    /// Display category of the last matching event's code
    LatestCategory {
        /// Codes that qualify an event, with their category mapping
        codes: CodeSet,
        /// Date restriction
        window: DateWindow,
    },
    /// Age in whole years at the given date
    AgeAt(NaiveDate),
    /// Recorded sex as a category label (`M`, `F`, or the missing label)
    Sex,
    /// Practice region as a category label; unknown regions get the label
    /// given here
    Region {
        /// Label for patients with no recorded region
        missing_label: String,
    },
    /// Area deprivation index rounded to the given granularity before any
    /// comparison, so the full-precision value never reaches a predicate
    DeprivationIndex {
        /// Rounding granularity (nearest multiple, half-up)
        round_to: u32,
    },
}

impl InputSource {
    pub(crate) fn evaluate(
        &self,
        events: &EventTable,
        patients: &[PatientAttributes],
    ) -> Column {
        match self {
            Self::HasEvent { codes, window } => {
                Column::Bool(window.apply(&events.with_codes(codes)).exists())
            }
            Self::EventCount { codes, window } => {
                Column::Count(window.apply(&events.with_codes(codes)).count())
            }
            Self::EarliestDate { codes, window } => {
                Column::Date(window.apply(&events.with_codes(codes)).earliest().date())
            }
            Self::LatestDate { codes, window } => {
                Column::Date(window.apply(&events.with_codes(codes)).latest().date())
            }
            Self::LatestValue { codes, window } => Column::Numeric(
                window
                    .apply(&events.with_codes(codes))
                    .latest()
                    .numeric_value(),
            ),
            Self::LatestCategory { codes, window } => Column::Category(
                window
                    .apply(&events.with_codes(codes))
                    .latest()
                    .category(codes),
            ),
            Self::AgeAt(date) => {
                let mut values = FxHashMap::default();
                for p in patients {
                    if let Some(age) = p.age_at(*date) {
                        values.insert(p.patient_id, f64::from(age));
                    }
                }
                Column::Numeric(PatientColumn::from_map(values))
            }
            Self::Sex => {
                let values = patients
                    .iter()
                    .map(|p| (p.patient_id, p.sex.label().to_string()))
                    .collect();
                Column::Category(PatientColumn::from_map(values))
            }
            Self::Region { missing_label } => {
                let values = patients
                    .iter()
                    .map(|p| {
                        let region = p
                            .region
                            .clone()
                            .unwrap_or_else(|| missing_label.clone());
                        (p.patient_id, region)
                    })
                    .collect();
                Column::Category(PatientColumn::from_map(values))
            }
            Self::DeprivationIndex { round_to } => {
                let mut values = FxHashMap::default();
                for p in patients {
                    if let Some(imd) = p.deprivation_index {
                        let rounded = banding::round_to_nearest(imd, *round_to);
                        values.insert(p.patient_id, f64::from(rounded));
                    }
                }
                Column::Numeric(PatientColumn::from_map(values))
            }
        }
    }
}

/// A computed per-patient column, typed by its value kind
#[derive(Debug, Clone)]
pub(crate) enum Column {
    Bool(PatientColumn<bool>),
    Count(PatientColumn<u32>),
    Date(PatientColumn<NaiveDate>),
    Numeric(PatientColumn<f64>),
    Category(PatientColumn<String>),
}

impl Column {
    /// The patient's value, with the flag/count totality baked in.
    ///
    /// Date, numeric, and category columns return `None` for patients with
    /// no recorded value; predicates treat that as false and pass-through
    /// rules substitute the kind's missing form.
    pub(crate) fn value_for(&self, patient: PatientId) -> Option<VariableValue> {
        match self {
            Self::Bool(col) => Some(VariableValue::Bool(col.flag(patient))),
            Self::Count(col) => Some(VariableValue::Count(col.count(patient))),
            Self::Date(col) => col
                .get(patient)
                .map(|d| VariableValue::Date(Some(*d))),
            Self::Numeric(col) => col
                .get(patient)
                .map(|v| VariableValue::Numeric(Some(*v))),
            Self::Category(col) => col
                .get(patient)
                .map(|l| VariableValue::Category(l.clone())),
        }
    }

    /// The kind's explicit missing value for dense cohort rows
    pub(crate) fn missing_value(&self) -> VariableValue {
        match self {
            Self::Bool(_) => VariableValue::Bool(false),
            Self::Count(_) => VariableValue::Count(0),
            Self::Date(_) => VariableValue::Date(None),
            Self::Numeric(_) => VariableValue::Numeric(None),
            Self::Category(_) => VariableValue::Category(MISSING_LABEL.to_string()),
        }
    }
}

/// The derivation a rule performs
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Ordered labelled arms; the first predicate that holds wins, and the
    /// declared default applies when none do
    Categorise {
        /// `(label, predicate)` arms in precedence order
        arms: Vec<(String, Predicate)>,
        /// Label assigned when no arm matches
        default: String,
    },
    /// Boolean flag from a single predicate
    Flag(Predicate),
    /// Pass a named input or rule through as the variable value
    Value(String),
}

/// A declarative specification of one derived per-patient variable
#[derive(Debug, Clone)]
pub struct VariableRule {
    /// Variable name the rule defines
    pub name: String,
    /// The derivation to perform
    pub kind: RuleKind,
}

impl VariableRule {
    /// An ordered categorisation with an explicit default label
    #[must_use]
    pub fn categorise<L: Into<String>>(
        name: &str,
        arms: Vec<(L, Predicate)>,
        default: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: RuleKind::Categorise {
                arms: arms
                    .into_iter()
                    .map(|(label, p)| (label.into(), p))
                    .collect(),
                default: default.to_string(),
            },
        }
    }

    /// A boolean flag
    #[must_use]
    pub fn flag(name: &str, predicate: Predicate) -> Self {
        Self {
            name: name.to_string(),
            kind: RuleKind::Flag(predicate),
        }
    }

    /// A pass-through of a named input or rule
    #[must_use]
    pub fn value(name: &str, input: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RuleKind::Value(input.to_string()),
        }
    }

    /// Names this rule depends on
    #[must_use]
    pub fn references(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        match &self.kind {
            RuleKind::Categorise { arms, .. } => {
                for (_, predicate) in arms {
                    predicate.collect_names(&mut names);
                }
            }
            RuleKind::Flag(predicate) => predicate.collect_names(&mut names),
            RuleKind::Value(input) => {
                names.insert(input.clone());
            }
        }
        names
    }

    /// Declared label universe for a categorisation, default included;
    /// `None` for flags and pass-throughs
    #[must_use]
    pub fn labels(&self) -> Option<Vec<String>> {
        match &self.kind {
            RuleKind::Categorise { arms, default } => {
                let mut labels: Vec<String> =
                    arms.iter().map(|(label, _)| label.clone()).collect();
                if !labels.iter().any(|l| l == default) {
                    labels.push(default.clone());
                }
                Some(labels)
            }
            _ => None,
        }
    }
}

/// The fixed set of inputs and rules a cohort is derived from
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub(crate) inputs: Vec<(String, InputSource)>,
    pub(crate) rules: Vec<VariableRule>,
}

impl RuleSet {
    /// An empty rule set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named input column
    #[must_use]
    pub fn input(mut self, name: &str, source: InputSource) -> Self {
        self.inputs.push((name.to_string(), source));
        self
    }

    /// Declare a derived variable
    #[must_use]
    pub fn rule(mut self, rule: VariableRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Variable names in declaration order (the cohort schema)
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Validate names and acyclicity, returning rule indices in evaluation
    /// order. Fails wholesale with a configuration error before any
    /// evaluation if the graph is invalid.
    pub fn evaluation_order(&self) -> Result<Vec<usize>> {
        let input_names: BTreeSet<&str> =
            self.inputs.iter().map(|(n, _)| n.as_str()).collect();
        if input_names.len() != self.inputs.len() {
            let dup = duplicate_name(self.inputs.iter().map(|(n, _)| n.as_str()));
            return Err(StudyError::DuplicateVariable(dup));
        }
        graph::evaluation_order(&input_names, &self.rules)
    }
}

fn duplicate_name<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return name.to_string();
        }
    }
    String::new()
}
