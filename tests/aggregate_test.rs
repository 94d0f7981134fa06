//! Cross-tabulation and supplementary breakdowns over the synthetic cohort.

mod common;

use cohort_counts::aggregate::{
    code_frequency, practice_distribution, practice_outcome_counts, practice_summary,
};
use cohort_counts::{Aggregator, StudyError};

#[test]
fn sex_crosstab_matches_the_hand_calculation() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);
    let aggregator = Aggregator::new(&cohort, "long_covid").unwrap();

    let rows = aggregator.crosstab("sex").unwrap();
    let female = rows.iter().find(|r| r.category == "F").unwrap();
    assert_eq!(female.without_outcome, 465);
    assert_eq!(female.with_outcome, 45);
    assert_eq!(female.rate_per_100k, 8823.5);
    assert_eq!(female.percentage, 90.0);

    let male = rows.iter().find(|r| r.category == "M").unwrap();
    assert_eq!(male.without_outcome, 485);
    assert_eq!(male.with_outcome, 5);
    assert_eq!(male.rate_per_100k, 1020.4);
    assert_eq!(male.percentage, 10.0);
}

#[test]
fn every_stratifier_partitions_the_positive_outcomes() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);
    let aggregator = Aggregator::new(&cohort, "long_covid").unwrap();
    assert_eq!(aggregator.total_positive(), 50);

    for stratifier in ["sex", "age_group", "region", "imd"] {
        let rows = aggregator.crosstab(stratifier).unwrap();
        assert_eq!(
            rows.iter().map(|r| r.with_outcome).sum::<u64>(),
            50,
            "stratifier {stratifier}"
        );
        assert_eq!(
            rows.iter()
                .map(|r| r.with_outcome + r.without_outcome)
                .sum::<u64>(),
            1000,
            "stratifier {stratifier}"
        );
    }
}

#[test]
fn declared_categories_appear_even_when_empty() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);
    let aggregator = Aggregator::new(&cohort, "long_covid").unwrap();

    let rows = aggregator.crosstab("age_group").unwrap();
    let eighty_plus = rows.iter().find(|r| r.category == "80+").unwrap();
    assert_eq!(eighty_plus.with_outcome + eighty_plus.without_outcome, 0);
    assert_eq!(eighty_plus.rate_per_100k, 0.0);
}

#[test]
fn wrong_variable_kinds_are_rejected() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);

    let err = Aggregator::new(&cohort, "sex").unwrap_err();
    assert!(matches!(err, StudyError::VariableKind { .. }));

    let aggregator = Aggregator::new(&cohort, "long_covid").unwrap();
    let err = aggregator.crosstab("long_covid").unwrap_err();
    assert!(matches!(err, StudyError::VariableKind { .. }));
    let err = aggregator.crosstab("nope").unwrap_err();
    assert!(matches!(err, StudyError::UnknownVariable(_)));
}

#[test]
fn code_frequency_keeps_zero_count_codes() {
    let events = common::events();
    let codes = common::outcome_codes();

    let rows = code_frequency(&events, &codes);
    assert_eq!(rows.len(), 2);
    let syndrome = rows.iter().find(|r| r.code == common::OUTCOME_CODE).unwrap();
    assert_eq!(syndrome.total_records, 50);
    assert_eq!(syndrome.percentage, 100.0);
    let referral = rows.iter().find(|r| r.code == common::REFERRAL_CODE).unwrap();
    assert_eq!(referral.total_records, 0);
    assert_eq!(referral.percentage, 0.0);
}

#[test]
fn practice_counts_cover_every_observed_practice() {
    let events = common::events();
    let attributes = common::patients();
    let cohort = common::build_cohort(&events, &attributes);

    let counts = practice_outcome_counts(&cohort, "long_covid").unwrap();
    assert_eq!(counts.len(), 25);
    assert_eq!(counts.values().sum::<u64>(), 50);

    let distribution = practice_distribution(&counts);
    assert_eq!(distribution.buckets.iter().map(|(_, n)| n).sum::<u64>(), 25);

    let summary = practice_summary(&counts);
    assert_eq!(summary.practice_count, 25);
    assert_eq!(summary.total_coded, 50);
    // 25 practices coding at most 3 each: the top ten hold well under all
    assert!(summary.top_ten_count < summary.total_coded);
}
