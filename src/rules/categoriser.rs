//! Ordered first-match-wins label assignment.

use crate::models::VariableValue;

use super::expr::Predicate;

/// Evaluator for a categorisation's ordered arms.
///
/// The walk is top to bottom and stops at the first predicate that holds;
/// later arms that would also hold are deliberate precedence, not an
/// error. When no arm matches, the declared default applies.
#[derive(Debug)]
pub struct Categoriser<'a> {
    arms: &'a [(String, Predicate)],
    default: &'a str,
}

impl<'a> Categoriser<'a> {
    /// Wrap a rule's arms and default for evaluation
    #[must_use]
    pub fn new(arms: &'a [(String, Predicate)], default: &'a str) -> Self {
        Self { arms, default }
    }

    /// The label for one patient, resolving names through `lookup`
    pub fn categorise<F>(&self, lookup: &F) -> &'a str
    where
        F: Fn(&str) -> Option<VariableValue>,
    {
        for (label, predicate) in self.arms {
            if predicate.evaluate(lookup) {
                return label;
            }
        }
        self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::var;

    fn lookup(age: Option<f64>) -> impl Fn(&str) -> Option<VariableValue> {
        move |name| match name {
            "age" => age.map(|a| VariableValue::Numeric(Some(a))),
            _ => None,
        }
    }

    fn age_arms() -> Vec<(String, Predicate)> {
        vec![
            ("0-49".to_string(), var("age").lt(50.0)),
            ("50-59".to_string(), var("age").ge(50.0).and(var("age").lt(60.0))),
            // deliberately overlapping with the arm above; must never win
            // for ages in the fifties
            ("50+".to_string(), var("age").ge(50.0)),
        ]
    }

    #[test]
    fn first_matching_arm_wins() {
        let arms = age_arms();
        let c = Categoriser::new(&arms, "missing");
        assert_eq!(c.categorise(&lookup(Some(55.0))), "50-59");
        assert_eq!(c.categorise(&lookup(Some(70.0))), "50+");
        assert_eq!(c.categorise(&lookup(Some(30.0))), "0-49");
    }

    #[test]
    fn default_applies_when_nothing_matches() {
        let arms = age_arms();
        let c = Categoriser::new(&arms, "missing");
        assert_eq!(c.categorise(&lookup(None)), "missing");
    }
}
