//! Per-branch selection conditions (`njets>=2`, `pt_1<20.5`, or `1`).

use std::fmt;
use std::str::FromStr;

use evs_core::{Column, Error, Result};

use crate::dataset::WorkingTree;
use crate::loader::load_column_as;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    /// `<`
    Less,
    /// `>`
    More,
    /// `==`
    Equal,
    /// `<=`
    LessOrEqual,
    /// `>=`
    MoreOrEqual,
}

/// Operator spellings, longest first so that prefix matching is unambiguous.
static OPS: &[(&str, CondOp)] = &[
    ("<=", CondOp::LessOrEqual),
    (">=", CondOp::MoreOrEqual),
    ("==", CondOp::Equal),
    ("<", CondOp::Less),
    (">", CondOp::More),
];

impl CondOp {
    /// Operator text.
    pub fn symbol(self) -> &'static str {
        OPS.iter().find(|(_, op)| *op == self).map_or("?", |(s, _)| *s)
    }

    fn apply<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            CondOp::Less => lhs < rhs,
            CondOp::More => lhs > rhs,
            CondOp::Equal => lhs == rhs,
            CondOp::LessOrEqual => lhs <= rhs,
            CondOp::MoreOrEqual => lhs >= rhs,
        }
    }
}

/// Threshold of a comparison; integer unless the text contained a `.` or
/// only parses as a float (`1e3`, `inf`, `NaN`).
#[derive(Debug, Clone, Copy)]
pub enum CondValue {
    /// Integer threshold.
    Int(i64),
    /// Floating point threshold.
    Float(f64),
}

/// NaN thresholds compare equal to each other so parsed conditions round trip.
impl PartialEq for CondValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CondValue::Int(a), CondValue::Int(b)) => a == b,
            (CondValue::Float(a), CondValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => false,
        }
    }
}

impl fmt::Display for CondValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondValue::Int(v) => write!(f, "{}", v),
            CondValue::Float(v) => {
                let text = v.to_string();
                if text.contains(['.', 'e', 'E', 'N', 'n']) {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
        }
    }
}

/// A row filter on one branch.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Condition {
    /// Passes every row (spelled `1`).
    #[default]
    AlwaysTrue,
    /// `branch op value`.
    Compare {
        /// Selector branch.
        branch: String,
        /// Comparison.
        op: CondOp,
        /// Threshold.
        value: CondValue,
    },
}

impl Condition {
    /// Whether the condition passes every row.
    pub fn is_always_true(&self) -> bool {
        matches!(self, Condition::AlwaysTrue)
    }

    /// Selector branch, if any.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Condition::AlwaysTrue => None,
            Condition::Compare { branch, .. } => Some(branch),
        }
    }

    /// Evaluate against an integer selector value.
    pub fn pass_int(&self, x: i64) -> bool {
        match self {
            Condition::AlwaysTrue => true,
            Condition::Compare { op, value: CondValue::Int(v), .. } => op.apply(x, *v),
            Condition::Compare { op, value: CondValue::Float(v), .. } => op.apply(x as f64, *v),
        }
    }

    /// Evaluate against a floating point selector value.
    pub fn pass_float(&self, x: f64) -> bool {
        match self {
            Condition::AlwaysTrue => true,
            Condition::Compare { op, value: CondValue::Float(v), .. } => op.apply(x, *v),
            Condition::Compare { op, value: CondValue::Int(v), .. } => op.apply(x, *v as f64),
        }
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "1" {
            return Ok(Condition::AlwaysTrue);
        }
        let invalid = || Error::InvalidCondition(s.to_string());
        if s.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        let split = s.find(['<', '>', '=']).ok_or_else(invalid)?;
        let (branch, rest) = s.split_at(split);
        if branch.is_empty() {
            return Err(invalid());
        }
        let (symbol, op) =
            OPS.iter().find(|(sym, _)| rest.starts_with(sym)).copied().ok_or_else(invalid)?;

        let text = &rest[symbol.len()..];
        let value = if text.contains('.') {
            CondValue::Float(text.parse().map_err(|_| invalid())?)
        } else if let Ok(v) = text.parse() {
            CondValue::Int(v)
        } else {
            CondValue::Float(text.parse().map_err(|_| invalid())?)
        };
        Ok(Condition::Compare { branch: branch.to_string(), op, value })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::AlwaysTrue => f.write_str("1"),
            Condition::Compare { branch, op, value } => {
                write!(f, "{}{}{}", branch, op.symbol(), value)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Bound {
    All,
    Int(Vec<i64>),
    Float(Vec<f64>),
}

/// A condition bound to its loaded selector column.
#[derive(Debug, Clone)]
pub struct RowSelector {
    condition: Condition,
    values: Bound,
}

impl RowSelector {
    /// Selector that passes every row.
    pub fn always() -> Self {
        Self { condition: Condition::AlwaysTrue, values: Bound::All }
    }

    /// Bind `condition` to an already loaded selector column.
    pub fn bind(condition: Condition, column: Column) -> Self {
        let values = match &condition {
            Condition::AlwaysTrue => Bound::All,
            Condition::Compare { value: CondValue::Int(_), .. } => Bound::Int(column.cast()),
            Condition::Compare { value: CondValue::Float(_), .. } => Bound::Float(column.cast()),
        };
        Self { condition, values }
    }

    /// Load the selector branch of `condition` from `tree` and bind it.
    pub fn load(condition: &Condition, tree: &WorkingTree) -> Result<Self> {
        let values = match condition {
            Condition::AlwaysTrue => Bound::All,
            Condition::Compare { branch, value: CondValue::Int(_), .. } => {
                Bound::Int(load_column_as::<i64>(tree, branch)?)
            }
            Condition::Compare { branch, value: CondValue::Float(_), .. } => {
                Bound::Float(load_column_as::<f64>(tree, branch)?)
            }
        };
        Ok(Self { condition: condition.clone(), values })
    }

    /// Whether `row` passes. Rows outside the bound column never pass.
    pub fn pass(&self, row: usize) -> bool {
        match &self.values {
            Bound::All => true,
            Bound::Int(v) => v.get(row).is_some_and(|x| self.condition.pass_int(*x)),
            Bound::Float(v) => v.get(row).is_some_and(|x| self.condition.pass_float(*x)),
        }
    }

    /// The bound condition.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(s: &str) -> Condition {
        s.parse().unwrap()
    }

    #[test]
    fn parses_operators_longest_first() {
        assert_eq!(
            cond("njets>=2"),
            Condition::Compare {
                branch: "njets".into(),
                op: CondOp::MoreOrEqual,
                value: CondValue::Int(2)
            }
        );
        assert_eq!(
            cond("pt_1<20.5"),
            Condition::Compare {
                branch: "pt_1".into(),
                op: CondOp::Less,
                value: CondValue::Float(20.5)
            }
        );
        assert!(matches!(cond("q==-1"), Condition::Compare { op: CondOp::Equal, .. }));
        assert!(matches!(cond("q<=0"), Condition::Compare { op: CondOp::LessOrEqual, .. }));
        assert!(cond("1").is_always_true());
    }

    #[test]
    fn rejects_malformed_text() {
        for bad in ["", "njets", ">=2", "njets=2", "njets>=", "njets >= 2", "pt<2.x", "n<1e", "n<x"] {
            assert!(
                matches!(bad.parse::<Condition>(), Err(Error::InvalidCondition(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn float_only_spellings_parse_as_float() {
        let value = |s: &str| match cond(s) {
            Condition::Compare { value, .. } => value,
            Condition::AlwaysTrue => panic!("{} parsed as always-true", s),
        };
        assert_eq!(value("n<1e3"), CondValue::Float(1000.0));
        assert_eq!(value("x>inf"), CondValue::Float(f64::INFINITY));
        assert_eq!(value("x>-inf"), CondValue::Float(f64::NEG_INFINITY));
        assert_eq!(value("x==NaN"), CondValue::Float(f64::NAN));
        assert_eq!(value("x==-9223372036854775808"), CondValue::Int(i64::MIN));
        assert!(!cond("x==NaN").pass_float(f64::NAN));
    }

    #[test]
    fn display_round_trips() {
        for text in ["1", "njets>=2", "pt_1<20.5", "iso==0", "eta>-2.4"] {
            assert_eq!(cond(text).to_string(), text);
        }

        let ints = [0, -1, 7, i64::MIN, i64::MAX].map(CondValue::Int);
        let floats = [
            0.0,
            -0.0,
            2.5,
            3.0,
            -1e-9,
            1e20,
            f64::MAX,
            f64::MIN,
            f64::MIN_POSITIVE,
            f64::EPSILON,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NAN,
        ]
        .map(CondValue::Float);
        for (_, op) in OPS {
            for value in ints.iter().chain(&floats) {
                let c = Condition::Compare { branch: "x".into(), op: *op, value: *value };
                let text = c.to_string();
                let back: Condition =
                    text.parse().unwrap_or_else(|e| panic!("{:?} -> {}: {}", c, text, e));
                assert_eq!(back, c, "{}", text);
                assert_eq!(back.to_string(), text);
            }
        }
        assert_eq!(
            Condition::Compare { branch: "x".into(), op: CondOp::More, value: CondValue::Float(3.0) }
                .to_string(),
            "x>3.0"
        );
    }

    #[test]
    fn evaluation() {
        let c = cond("njets>=2");
        assert!(c.pass_int(2));
        assert!(!c.pass_int(1));
        assert!(c.pass_float(2.5));

        let c = cond("pt<20.5");
        assert!(c.pass_float(20.4));
        assert!(!c.pass_float(20.5));
        assert!(c.pass_int(20));

        assert!(Condition::AlwaysTrue.pass_int(i64::MIN));
    }

    #[test]
    fn selector_binds_column_in_condition_kind() {
        let sel = RowSelector::bind(cond("njets>=2"), Column::F32(vec![1.9, 2.7, 3.0]));
        assert_eq!((0..3).map(|r| sel.pass(r)).collect::<Vec<_>>(), vec![false, true, true]);
        assert!(!sel.pass(3));

        let sel = RowSelector::bind(cond("pt>1.5"), Column::I32(vec![1, 2]));
        assert!(!sel.pass(0));
        assert!(sel.pass(1));

        assert!(RowSelector::always().pass(1_000_000));
    }
}
