//! Cohort construction: population selection and rule evaluation.
//!
//! The builder evaluates every declared rule over every patient satisfying
//! the population criteria, producing one dense row per population member.
//! Input columns are computed once and shared by all rules that reference
//! them.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::error::{Result, StudyError};
use crate::events::EventTable;
use crate::models::{PatientAttributes, PatientId, VariableValue};
use crate::rules::categoriser::Categoriser;
use crate::rules::{Column, RuleKind, RuleSet, VariableRule};

/// Criteria a patient must meet to enter the study population
#[derive(Debug, Clone)]
pub enum PopulationCriteria {
    /// Registered with a practice at the given date
    RegisteredAt(NaiveDate),
    /// Sex recorded as male or female
    KnownSex,
    /// Age within an inclusive range at a reference date; patients with no
    /// calculable age are excluded
    AgeRange {
        /// Minimum age (inclusive), if bounded
        min_age: Option<u32>,
        /// Maximum age (inclusive), if bounded
        max_age: Option<u32>,
        /// Reference date for the age calculation
        reference_date: NaiveDate,
    },
    /// All criteria must be met
    All(Vec<PopulationCriteria>),
    /// Any criterion suffices
    Any(Vec<PopulationCriteria>),
}

impl PopulationCriteria {
    /// The universal population (no restriction)
    #[must_use]
    pub const fn everyone() -> Self {
        Self::All(Vec::new())
    }

    /// Determine if a patient meets the criteria
    #[must_use]
    pub fn meets(&self, patient: &PatientAttributes) -> bool {
        match self {
            Self::RegisteredAt(date) => patient.registered_at(*date),
            Self::KnownSex => patient.sex.is_known(),
            Self::AgeRange {
                min_age,
                max_age,
                reference_date,
            } => match patient.age_at(*reference_date) {
                Some(age) if age >= 0 => {
                    let age = age as u32;
                    min_age.is_none_or(|min| age >= min)
                        && max_age.is_none_or(|max| age <= max)
                }
                _ => false,
            },
            Self::All(criteria) => criteria.iter().all(|c| c.meets(patient)),
            Self::Any(criteria) => criteria.iter().any(|c| c.meets(patient)),
        }
    }
}

/// One derived column of the wide cohort table
#[derive(Debug, Clone)]
struct CohortColumn {
    name: String,
    labels: Option<Vec<String>>,
    values: Vec<VariableValue>,
}

/// The wide cohort table: one dense row per population member.
///
/// Computed once per run and not mutated afterwards.
#[derive(Debug, Clone)]
pub struct Cohort {
    patients: Vec<PatientId>,
    practices: Vec<Option<u32>>,
    columns: Vec<CohortColumn>,
}

impl Cohort {
    /// Number of population members
    #[must_use]
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    /// Whether the population is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Patient identifiers in row order
    #[must_use]
    pub fn patient_ids(&self) -> &[PatientId] {
        &self.patients
    }

    /// Registered practice per row, aligned with `patient_ids`
    #[must_use]
    pub fn practice_ids(&self) -> &[Option<u32>] {
        &self.practices
    }

    /// Variable names in schema order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// All values of one variable, aligned with `patient_ids`
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[VariableValue]> {
        self.find(name).map(|c| c.values.as_slice())
    }

    /// Declared label universe of a categorical variable, if it has one
    #[must_use]
    pub fn labels(&self, name: &str) -> Option<&[String]> {
        self.find(name).and_then(|c| c.labels.as_deref())
    }

    /// A boolean variable's values; errors if the variable is missing or
    /// not boolean
    pub fn bool_column(&self, name: &str) -> Result<Vec<bool>> {
        let column = self
            .find(name)
            .ok_or_else(|| StudyError::UnknownVariable(name.to_string()))?;
        column
            .values
            .iter()
            .map(|v| {
                v.as_bool().ok_or_else(|| StudyError::VariableKind {
                    name: name.to_string(),
                    expected: "a boolean outcome",
                })
            })
            .collect()
    }

    /// A categorical variable's labels; errors if the variable is missing
    /// or not categorical
    pub fn category_column(&self, name: &str) -> Result<Vec<&str>> {
        let column = self
            .find(name)
            .ok_or_else(|| StudyError::UnknownVariable(name.to_string()))?;
        column
            .values
            .iter()
            .map(|v| {
                v.as_category().ok_or_else(|| StudyError::VariableKind {
                    name: name.to_string(),
                    expected: "a categorical stratifier",
                })
            })
            .collect()
    }

    /// A date variable's values; errors if the variable is missing or not
    /// a date
    pub fn date_column(&self, name: &str) -> Result<Vec<Option<NaiveDate>>> {
        let column = self
            .find(name)
            .ok_or_else(|| StudyError::UnknownVariable(name.to_string()))?;
        column
            .values
            .iter()
            .map(|v| match v {
                VariableValue::Date(d) => Ok(*d),
                _ => Err(StudyError::VariableKind {
                    name: name.to_string(),
                    expected: "a date series",
                }),
            })
            .collect()
    }

    fn find(&self, name: &str) -> Option<&CohortColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Orchestrates rule evaluation into a [`Cohort`]
#[derive(Debug)]
pub struct CohortBuilder<'a> {
    events: &'a EventTable,
    attributes: &'a [PatientAttributes],
    ruleset: RuleSet,
    population: PopulationCriteria,
}

impl<'a> CohortBuilder<'a> {
    /// Start a build over one event snapshot and attribute set
    #[must_use]
    pub fn new(events: &'a EventTable, attributes: &'a [PatientAttributes]) -> Self {
        Self {
            events,
            attributes,
            ruleset: RuleSet::new(),
            population: PopulationCriteria::everyone(),
        }
    }

    /// Set the inputs and rules to derive
    #[must_use]
    pub fn with_rules(mut self, ruleset: RuleSet) -> Self {
        self.ruleset = ruleset;
        self
    }

    /// Set the population membership criteria
    #[must_use]
    pub fn with_population(mut self, criteria: PopulationCriteria) -> Self {
        self.population = criteria;
        self
    }

    /// Derive the cohort.
    ///
    /// Fails wholesale with a configuration error before any evaluation if
    /// the rule graph is invalid; per-patient missing data never fails the
    /// build.
    pub fn build(self) -> Result<Cohort> {
        // validate before touching any data
        let order = self.ruleset.evaluation_order()?;

        log::info!(
            "Building cohort: {} inputs, {} rules over {} patients",
            self.ruleset.inputs.len(),
            self.ruleset.rules.len(),
            self.attributes.len()
        );

        let mut columns: FxHashMap<String, Column> = FxHashMap::default();
        for (name, source) in &self.ruleset.inputs {
            columns.insert(name.clone(), source.evaluate(self.events, self.attributes));
        }

        let population: Vec<&PatientAttributes> = self
            .attributes
            .iter()
            .filter(|p| self.population.meets(p))
            .collect();
        log::info!(
            "Population: {} of {} patients meet the membership criteria",
            population.len(),
            self.attributes.len()
        );

        for &i in &order {
            let rule = &self.ruleset.rules[i];
            let column = evaluate_rule(rule, &population, &columns)?;
            columns.insert(rule.name.clone(), column);
        }

        let mut cohort_columns = Vec::with_capacity(self.ruleset.rules.len());
        for rule in &self.ruleset.rules {
            let column = &columns[&rule.name];
            let values = population
                .iter()
                .map(|p| {
                    column
                        .value_for(p.patient_id)
                        .unwrap_or_else(|| column.missing_value())
                })
                .collect();
            cohort_columns.push(CohortColumn {
                name: rule.name.clone(),
                labels: rule.labels(),
                values,
            });
        }

        log::info!("Cohort build complete: {} rows", population.len());
        Ok(Cohort {
            patients: population.iter().map(|p| p.patient_id).collect(),
            practices: population.iter().map(|p| p.practice_id).collect(),
            columns: cohort_columns,
        })
    }
}

fn evaluate_rule(
    rule: &VariableRule,
    population: &[&PatientAttributes],
    columns: &FxHashMap<String, Column>,
) -> Result<Column> {
    match &rule.kind {
        RuleKind::Value(input) => columns
            .get(input)
            .cloned()
            .ok_or_else(|| StudyError::UnknownVariable(input.clone())),
        RuleKind::Flag(predicate) => {
            let mut values = FxHashMap::default();
            for p in population {
                let lookup =
                    |name: &str| columns.get(name).and_then(|c| c.value_for(p.patient_id));
                values.insert(p.patient_id, predicate.evaluate(&lookup));
            }
            Ok(Column::Bool(crate::events::PatientColumn::from_map(values)))
        }
        RuleKind::Categorise { arms, default } => {
            let categoriser = Categoriser::new(arms, default);
            let mut values = FxHashMap::default();
            for p in population {
                let lookup =
                    |name: &str| columns.get(name).and_then(|c| c.value_for(p.patient_id));
                values.insert(p.patient_id, categoriser.categorise(&lookup).to_string());
            }
            Ok(Column::Category(crate::events::PatientColumn::from_map(
                values,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RegistrationInterval, Sex};

    fn patient(age_years: Option<i32>, sex: Sex) -> PatientAttributes {
        PatientAttributes {
            patient_id: PatientId(1),
            sex,
            // a birthday a month before the 2020-11-02 reference date
            date_of_birth: age_years.and_then(|a| NaiveDate::from_ymd_opt(2020 - a, 10, 1)),
            region: None,
            deprivation_index: None,
            practice_id: None,
            registrations: vec![RegistrationInterval {
                start: NaiveDate::from_ymd_opt(2015, 1, 1),
                end: None,
            }],
        }
    }

    #[test]
    fn age_range_excludes_unknown_ages() {
        let reference = NaiveDate::from_ymd_opt(2020, 11, 2).unwrap();
        let criteria = PopulationCriteria::AgeRange {
            min_age: Some(18),
            max_age: Some(110),
            reference_date: reference,
        };
        assert!(criteria.meets(&patient(Some(40), Sex::Female)));
        assert!(!criteria.meets(&patient(Some(12), Sex::Female)));
        assert!(!criteria.meets(&patient(None, Sex::Female)));
    }

    #[test]
    fn any_combinator_needs_one_branch() {
        let reference = NaiveDate::from_ymd_opt(2020, 11, 2).unwrap();
        let criteria = PopulationCriteria::Any(vec![
            PopulationCriteria::KnownSex,
            PopulationCriteria::AgeRange {
                min_age: Some(65),
                max_age: None,
                reference_date: reference,
            },
        ]);
        assert!(criteria.meets(&patient(Some(40), Sex::Female)));
        assert!(criteria.meets(&patient(Some(70), Sex::Unknown)));
        assert!(!criteria.meets(&patient(Some(40), Sex::Unknown)));
    }

    #[test]
    fn everyone_admits_any_patient() {
        assert!(PopulationCriteria::everyone().meets(&patient(None, Sex::Unknown)));
    }
}
