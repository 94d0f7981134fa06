//! Cohort derivation over the synthetic population.

mod common;

use chrono::NaiveDate;
use cohort_counts::models::RegistrationInterval;
use cohort_counts::{
    CohortBuilder, ErrorKind, PatientId, RuleSet, StudyError, VariableRule, var,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn every_population_member_gets_a_dense_row() {
    init_logging();
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);

    assert_eq!(cohort.len(), 1000);
    assert_eq!(cohort.variable_names().count(), 6);
    for name in ["long_covid", "first_long_covid_date", "age_group", "sex", "region", "imd"] {
        let column = cohort.column(name).unwrap_or_else(|| panic!("column {name}"));
        assert_eq!(column.len(), cohort.len());
    }
}

#[test]
fn outcome_flag_counts_the_positive_patients() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);

    let flags = cohort.bool_column("long_covid").unwrap();
    assert_eq!(flags.iter().filter(|&&b| b).count(), 50);
}

#[test]
fn unusable_birth_date_lands_in_the_default_category() {
    // patient 1000 has no parseable date of birth; the age input is absent
    // for them, every age band predicate is false, and the rule default
    // applies instead of the row being dropped
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);

    let row = cohort
        .patient_ids()
        .iter()
        .position(|&id| id == PatientId(1000))
        .unwrap();
    let ages = cohort.category_column("age_group").unwrap();
    assert_eq!(ages[row], "missing");
    let sexes = cohort.category_column("sex").unwrap();
    assert_eq!(sexes[row], "F");
}

#[test]
fn categorical_variables_stay_within_their_label_universe() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);

    let labels = cohort.labels("age_group").unwrap();
    for category in cohort.category_column("age_group").unwrap() {
        assert!(labels.iter().any(|l| l == category), "unexpected category {category}");
    }
    assert!(labels.iter().any(|l| l == "missing"));
}

#[test]
fn lapsed_registration_excludes_the_patient() {
    let events = common::events();
    let mut attributes = common::patients();
    attributes[0].registrations = vec![RegistrationInterval {
        start: NaiveDate::from_ymd_opt(2021, 6, 1),
        end: None,
    }];

    let cohort = common::build_cohort(&events, &attributes);
    assert_eq!(cohort.len(), 999);
    assert!(!cohort.patient_ids().contains(&PatientId(1)));
}

#[test]
fn cyclic_rules_fail_before_any_evaluation() {
    let events = common::events();
    let attributes = common::patients();
    let rules = RuleSet::new()
        .rule(VariableRule::flag("a", var("b").is_true()))
        .rule(VariableRule::flag("b", var("a").is_true()));

    let err = CohortBuilder::new(&events, &attributes)
        .with_rules(rules)
        .build()
        .unwrap_err();
    assert!(matches!(err, StudyError::CyclicDependency(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn rules_referencing_undeclared_names_are_rejected() {
    let events = common::events();
    let attributes = common::patients();
    let rules = RuleSet::new().rule(VariableRule::flag("a", var("nope").is_true()));

    let err = CohortBuilder::new(&events, &attributes)
        .with_rules(rules)
        .build()
        .unwrap_err();
    assert!(matches!(err, StudyError::UnknownVariable(name) if name == "nope"));
}
