//! Per-code usage breakdown.

use serde::Serialize;

use crate::codeset::CodeSet;
use crate::events::EventTable;

/// One code's row in the frequency breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeFrequencyRow {
    /// The clinical code
    pub code: String,
    /// Display term mapped to the code, if any
    pub term: Option<String>,
    /// Total matching event records
    pub total_records: u64,
    /// Share of all records across the set's codes
    pub percentage: f64,
}

/// Count event records per code of the set.
///
/// Every code in the set gets a row, zero-count codes included, in the
/// set's deterministic code order. The caller restricts the table (dates,
/// population) before counting.
#[must_use]
pub fn code_frequency(events: &EventTable, codes: &CodeSet) -> Vec<CodeFrequencyRow> {
    let matching = events.with_codes(codes);
    let mut counts: rustc_hash::FxHashMap<&str, u64> = rustc_hash::FxHashMap::default();
    for event in matching.iter() {
        *counts.entry(event.code.as_str()).or_insert(0) += 1;
    }
    let total: u64 = counts.values().sum();

    codes
        .codes()
        .map(|code| {
            let records = counts.get(code).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                records as f64 / total as f64 * 100.0
            };
            CodeFrequencyRow {
                code: code.to_string(),
                term: codes.term(code).map(str::to_string),
                total_records: records,
                percentage,
            }
        })
        .collect()
}
