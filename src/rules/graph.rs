//! Build-time validation of the rule dependency graph.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::error::{Result, StudyError};

use super::VariableRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate references and return rule indices in dependency order.
///
/// References to declared inputs are leaves; references to other rules form
/// the graph edges. A name that is neither is an unknown-variable error, a
/// back edge is reported as a cycle with its path, and a rule shadowing an
/// input (or another rule) is a duplicate.
pub(crate) fn evaluation_order(
    input_names: &BTreeSet<&str>,
    rules: &[VariableRule],
) -> Result<Vec<usize>> {
    let mut index_of: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, rule) in rules.iter().enumerate() {
        if input_names.contains(rule.name.as_str())
            || index_of.insert(rule.name.as_str(), i).is_some()
        {
            return Err(StudyError::DuplicateVariable(rule.name.clone()));
        }
    }

    let mut marks = vec![Mark::Unvisited; rules.len()];
    let mut order = Vec::with_capacity(rules.len());
    let mut stack: Vec<String> = Vec::new();

    for i in 0..rules.len() {
        visit(i, rules, input_names, &index_of, &mut marks, &mut order, &mut stack)?;
    }
    Ok(order)
}

fn visit(
    i: usize,
    rules: &[VariableRule],
    input_names: &BTreeSet<&str>,
    index_of: &FxHashMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    stack: &mut Vec<String>,
) -> Result<()> {
    match marks[i] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            // close the loop for the error message
            stack.push(rules[i].name.clone());
            let start = stack
                .iter()
                .position(|n| *n == rules[i].name)
                .unwrap_or(0);
            return Err(StudyError::CyclicDependency(stack[start..].join(" -> ")));
        }
        Mark::Unvisited => {}
    }
    marks[i] = Mark::InProgress;
    stack.push(rules[i].name.clone());

    for name in rules[i].references() {
        if input_names.contains(name.as_str()) {
            continue;
        }
        match index_of.get(name.as_str()) {
            Some(&dep) => {
                visit(dep, rules, input_names, index_of, marks, order, stack)?;
            }
            None => return Err(StudyError::UnknownVariable(name)),
        }
    }

    stack.pop();
    marks[i] = Mark::Done;
    order.push(i);
    Ok(())
}
