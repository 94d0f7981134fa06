//! Shared fixtures: a synthetic 1000-patient population with a 490/510
//! male/female split and 50 positive outcomes (5 male, 45 female).

// not every test binary uses every fixture
#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use cohort_counts::{
    CodeSet, CodingSystem, Cohort, CohortBuilder, DateWindow, EventTable, InputSource,
    PatientAttributes, PatientId, PopulationCriteria, RawEvent, RuleSet, Sex, StudyConfig,
    VariableRule, var,
};
use cohort_counts::models::RegistrationInterval;

pub const OUTCOME_CODE: &str = "1325161000000102";
pub const REFERRAL_CODE: &str = "1325181000000106";

pub fn index_date() -> NaiveDate {
    StudyConfig::default().index_date
}

pub fn outcome_codes() -> CodeSet {
    CodeSet::with_terms(
        "long_covid",
        CodingSystem::Snomed,
        [
            (OUTCOME_CODE, "Post-COVID-19 syndrome"),
            (REFERRAL_CODE, "Referral to post-COVID assessment clinic"),
        ],
    )
}

fn is_positive(id: u64) -> bool {
    // 5 positive males, 45 positive females
    (1..=5).contains(&id) || (491..=535).contains(&id)
}

pub fn patients() -> Vec<PatientAttributes> {
    (1..=1000u64)
        .map(|id| {
            let sex = if id <= 490 { Sex::Male } else { Sex::Female };
            let date_of_birth = if id == 1000 {
                None // unparseable in the source data
            } else if id <= 490 {
                NaiveDate::from_ymd_opt(1980, 5, 10)
            } else {
                NaiveDate::from_ymd_opt(1960, 1, 15)
            };
            let region = match id % 3 {
                0 => None,
                1 => Some("London".to_string()),
                _ => Some("East".to_string()),
            };
            let deprivation_index = if id % 7 == 0 {
                None
            } else {
                Some(u32::try_from((id * 31) % 32_900).unwrap())
            };
            PatientAttributes {
                patient_id: PatientId(id),
                sex,
                date_of_birth,
                region,
                deprivation_index,
                practice_id: Some(u32::try_from(id % 25).unwrap()),
                registrations: vec![RegistrationInterval {
                    start: NaiveDate::from_ymd_opt(2015, 1, 1),
                    end: None,
                }],
            }
        })
        .collect()
}

pub fn events() -> EventTable {
    let mut rows = Vec::new();
    for id in 1..=1000u64 {
        if is_positive(id) {
            let date = index_date() + Days::new(id % 7);
            rows.push(RawEvent {
                patient_id: id,
                code: OUTCOME_CODE.to_string(),
                system: "snomed".to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                numeric_value: None,
                practice_id: Some(u32::try_from(id % 25).unwrap()),
            });
        }
    }
    // one malformed row; absorbed with a warning, never an error
    rows.push(RawEvent {
        patient_id: 42,
        code: OUTCOME_CODE.to_string(),
        system: "snomed".to_string(),
        date: "02/11/2020".to_string(),
        numeric_value: None,
        practice_id: None,
    });
    EventTable::from_raw(rows)
}

pub fn study_rules() -> RuleSet {
    let codes = outcome_codes();
    let config = StudyConfig::default();
    let index = config.index_date;
    let outcome_window = DateWindow::between(index, index + Days::new(6));
    RuleSet::new()
        .input(
            "long_covid_event",
            InputSource::HasEvent {
                codes: codes.clone(),
                window: outcome_window,
            },
        )
        .input(
            "first_long_covid",
            InputSource::EarliestDate {
                codes,
                window: DateWindow::all(),
            },
        )
        .input("age", InputSource::AgeAt(index))
        .input("sex_attr", InputSource::Sex)
        .input(
            "region_attr",
            InputSource::Region {
                missing_label: "Missing".to_string(),
            },
        )
        .input("imd_value", InputSource::DeprivationIndex { round_to: 100 })
        .rule(VariableRule::flag(
            "long_covid",
            var("long_covid_event").is_true(),
        ))
        .rule(VariableRule::value(
            "first_long_covid_date",
            "first_long_covid",
        ))
        .rule(VariableRule::categorise(
            "age_group",
            vec![
                ("0-49", var("age").lt(50.0)),
                ("50-59", var("age").ge(50.0).and(var("age").lt(60.0))),
                ("60-69", var("age").ge(60.0).and(var("age").lt(70.0))),
                ("70-79", var("age").ge(70.0).and(var("age").lt(80.0))),
                ("80+", var("age").ge(80.0)),
            ],
            "missing",
        ))
        .rule(VariableRule::value("sex", "sex_attr"))
        .rule(VariableRule::value("region", "region_attr"))
        .rule(VariableRule::categorise(
            "imd",
            config.deprivation_quintiles("imd_value"),
            "0",
        ))
}

pub fn population() -> PopulationCriteria {
    StudyConfig::default().index_population()
}

pub fn build_cohort(events: &EventTable, attributes: &[PatientAttributes]) -> Cohort {
    CohortBuilder::new(events, attributes)
        .with_rules(study_rules())
        .with_population(population())
        .build()
        .expect("fixture cohort builds")
}
