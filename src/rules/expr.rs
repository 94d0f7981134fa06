//! Typed predicate trees over named derived values.
//!
//! Predicates are built with a small combinator API (`var("age").gte(18)`)
//! and evaluated by an explicit walk, so rule conditions never go through
//! runtime expression parsing and the names a predicate depends on can be
//! collected statically for cycle analysis.

use std::collections::BTreeSet;

use crate::models::VariableValue;

/// Comparison operator for numeric predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl CmpOp {
    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// A boolean condition over named inputs and previously derived rules.
///
/// Evaluation is total: a reference to a value that is missing for the
/// current patient evaluates to `false`, never to an error.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Truth of a named value (flag, non-zero count, present date)
    Var(String),
    /// Negation
    Not(Box<Predicate>),
    /// Both sides hold
    And(Box<Predicate>, Box<Predicate>),
    /// Either side holds
    Or(Box<Predicate>, Box<Predicate>),
    /// Numeric comparison against a named numeric or count value
    Cmp {
        /// Name of the compared value
        name: String,
        /// Comparison operator
        op: CmpOp,
        /// Constant to compare against
        value: f64,
    },
    /// Category equality on a named categorical value
    IsCategory {
        /// Name of the categorical value
        name: String,
        /// Label to match
        label: String,
    },
    /// Always true; the conventional DEFAULT arm
    True,
}

impl Predicate {
    /// Conjunction
    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }

    /// Disjunction
    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }

    /// Negation
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Names this predicate depends on
    pub(crate) fn collect_names(&self, set: &mut BTreeSet<String>) {
        match self {
            Self::Var(name) | Self::Cmp { name, .. } | Self::IsCategory { name, .. } => {
                set.insert(name.clone());
            }
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_names(set);
                rhs.collect_names(set);
            }
            Self::Not(inner) => inner.collect_names(set),
            Self::True => {}
        }
    }

    /// Evaluate for one patient, resolving names through `lookup`
    pub(crate) fn evaluate<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<VariableValue>,
    {
        match self {
            Self::Var(name) => lookup(name).is_some_and(|v| v.truthy()),
            Self::Not(inner) => !inner.evaluate(lookup),
            Self::And(lhs, rhs) => lhs.evaluate(lookup) && rhs.evaluate(lookup),
            Self::Or(lhs, rhs) => lhs.evaluate(lookup) || rhs.evaluate(lookup),
            Self::Cmp { name, op, value } => lookup(name)
                .and_then(|v| v.as_numeric())
                .is_some_and(|lhs| op.apply(lhs, *value)),
            Self::IsCategory { name, label } => lookup(name)
                .is_some_and(|v| v.as_category() == Some(label.as_str())),
            Self::True => true,
        }
    }
}

/// Start building a predicate on a named value
#[must_use]
pub fn var(name: &str) -> VarBuilder {
    VarBuilder {
        name: name.to_string(),
    }
}

/// Builder for predicates on one named value
pub struct VarBuilder {
    name: String,
}

impl VarBuilder {
    /// Truth of the value itself
    #[must_use]
    pub fn is_true(self) -> Predicate {
        Predicate::Var(self.name)
    }

    /// The value is false or missing
    #[must_use]
    pub fn is_false(self) -> Predicate {
        Predicate::Var(self.name).negate()
    }

    /// Category equality
    #[must_use]
    pub fn is(self, label: &str) -> Predicate {
        Predicate::IsCategory {
            name: self.name,
            label: label.to_string(),
        }
    }

    fn cmp(self, op: CmpOp, value: f64) -> Predicate {
        Predicate::Cmp {
            name: self.name,
            op,
            value,
        }
    }

    /// Numeric equality
    #[must_use]
    pub fn eq(self, value: f64) -> Predicate {
        self.cmp(CmpOp::Eq, value)
    }

    /// Numeric inequality
    #[must_use]
    pub fn ne(self, value: f64) -> Predicate {
        self.cmp(CmpOp::Ne, value)
    }

    /// Strictly less than
    #[must_use]
    pub fn lt(self, value: f64) -> Predicate {
        self.cmp(CmpOp::Lt, value)
    }

    /// Less than or equal
    #[must_use]
    pub fn le(self, value: f64) -> Predicate {
        self.cmp(CmpOp::Le, value)
    }

    /// Strictly greater than
    #[must_use]
    pub fn gt(self, value: f64) -> Predicate {
        self.cmp(CmpOp::Gt, value)
    }

    /// Greater than or equal
    #[must_use]
    pub fn ge(self, value: f64) -> Predicate {
        self.cmp(CmpOp::Ge, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(
        pairs: &'a [(&'a str, VariableValue)],
    ) -> impl Fn(&str) -> Option<VariableValue> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn missing_values_evaluate_false_not_error() {
        let p = var("nowhere").is_true();
        assert!(!p.evaluate(&lookup(&[])));
        let c = var("nowhere").ge(1.0);
        assert!(!c.evaluate(&lookup(&[])));
    }

    #[test]
    fn comparison_and_combinators() {
        let values = [
            ("age", VariableValue::Numeric(Some(45.0))),
            ("prednisolone", VariableValue::Count(3)),
        ];
        let p = var("age")
            .ge(35.0)
            .and(var("age").lt(45.0));
        assert!(!p.evaluate(&lookup(&values)));
        let q = var("prednisolone")
            .gt(0.0)
            .and(var("prednisolone").lt(5.0));
        assert!(q.evaluate(&lookup(&values)));
    }

    #[test]
    fn count_is_truthy_when_nonzero() {
        let values = [("meds", VariableValue::Count(2))];
        assert!(var("meds").is_true().evaluate(&lookup(&values)));
        let zero = [("meds", VariableValue::Count(0))];
        assert!(!var("meds").is_true().evaluate(&lookup(&zero)));
    }

    #[test]
    fn collect_names_walks_the_whole_tree() {
        let p = var("a")
            .is_true()
            .and(var("b").ge(1.0).or(var("c").is("x").negate()));
        let mut names = BTreeSet::new();
        p.collect_names(&mut names);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
