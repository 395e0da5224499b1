//! Filtering: a boolean predicate tree over columns, with the transposition
//! algorithm used for pushdown.
//!
//! Leaves compare a column against a literal with EQ/GT/LT; internal nodes
//! are AND/OR. Negation is carried as a flag on the node and only applied
//! at evaluation time (De Morgan), never distributed during transposition.
//! Constant `True` leaves exist solely as the output of transposition.

use std::cmp::Ordering as Cmp;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datapoint::DataPoint;
use crate::structure::DataStructure;
use crate::value::VtlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filtering {
    /// Constant leaf; tests `!negated`. Produced by transposition only.
    True { negated: bool },
    Literal {
        column: String,
        op: CompareOp,
        value: VtlValue,
        negated: bool,
    },
    And {
        operands: Vec<Filtering>,
        negated: bool,
    },
    Or {
        operands: Vec<Filtering>,
        negated: bool,
    },
}

impl Filtering {
    /// The filter that accepts every row.
    pub fn all() -> Filtering {
        Filtering::True { negated: false }
    }

    /// Constant leaf evaluating to `value`.
    pub fn constant(value: bool) -> Filtering {
        Filtering::True { negated: !value }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<VtlValue>) -> Filtering {
        Self::literal(column, CompareOp::Eq, value, false)
    }

    pub fn neq(column: impl Into<String>, value: impl Into<VtlValue>) -> Filtering {
        Self::literal(column, CompareOp::Eq, value, true)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<VtlValue>) -> Filtering {
        Self::literal(column, CompareOp::Gt, value, false)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<VtlValue>) -> Filtering {
        Self::literal(column, CompareOp::Lt, value, false)
    }

    /// Greater-or-equal is a negated less-than.
    pub fn ge(column: impl Into<String>, value: impl Into<VtlValue>) -> Filtering {
        Self::literal(column, CompareOp::Lt, value, true)
    }

    /// Less-or-equal is a negated greater-than.
    pub fn le(column: impl Into<String>, value: impl Into<VtlValue>) -> Filtering {
        Self::literal(column, CompareOp::Gt, value, true)
    }

    fn literal(
        column: impl Into<String>,
        op: CompareOp,
        value: impl Into<VtlValue>,
        negated: bool,
    ) -> Filtering {
        Filtering::Literal {
            column: column.into(),
            op,
            value: value.into(),
            negated,
        }
    }

    pub fn and(operands: Vec<Filtering>) -> Filtering {
        Filtering::And {
            operands,
            negated: false,
        }
    }

    pub fn or(operands: Vec<Filtering>) -> Filtering {
        Filtering::Or {
            operands,
            negated: false,
        }
    }

    /// Flips the negation flag of the root node.
    pub fn not(self) -> Filtering {
        match self {
            Filtering::True { negated } => Filtering::True { negated: !negated },
            Filtering::Literal {
                column,
                op,
                value,
                negated,
            } => Filtering::Literal {
                column,
                op,
                value,
                negated: !negated,
            },
            Filtering::And { operands, negated } => Filtering::And {
                operands,
                negated: !negated,
            },
            Filtering::Or { operands, negated } => Filtering::Or {
                operands,
                negated: !negated,
            },
        }
    }

    fn is_constant(&self, value: bool) -> bool {
        matches!(self, Filtering::True { negated } if *negated != value)
    }

    /// Relaxes this filter so it can be evaluated against a child whose
    /// schema only carries `child_columns`.
    ///
    /// Every leaf over an absent column is neutralized with a constant
    /// that, once the negations on the path to the root are applied,
    /// evaluates to true. The result therefore accepts at least every row
    /// the original accepts and is safe to push down as a pre-filter, as
    /// long as the strict filter is re-tested where all columns exist.
    pub fn transpose(&self, child_columns: &HashSet<String>) -> Filtering {
        self.transpose_in(child_columns, false)
    }

    fn transpose_in(&self, child_columns: &HashSet<String>, flipped: bool) -> Filtering {
        match self {
            Filtering::True { .. } => self.clone(),
            Filtering::Literal { column, .. } => {
                if child_columns.contains(column) {
                    self.clone()
                } else {
                    // In an odd negation context the neutral element is the
                    // constant false, not true.
                    Filtering::constant(!flipped)
                }
            }
            Filtering::And { operands, negated } => {
                let context = flipped ^ negated;
                let transposed: Vec<Filtering> = operands
                    .iter()
                    .map(|operand| operand.transpose_in(child_columns, context))
                    .collect();
                if transposed.iter().any(|op| op.is_constant(false)) {
                    Filtering::constant(*negated)
                } else if transposed.iter().all(|op| op.is_constant(true)) {
                    Filtering::constant(!*negated)
                } else {
                    Filtering::And {
                        operands: transposed,
                        negated: *negated,
                    }
                }
            }
            Filtering::Or { operands, negated } => {
                let context = flipped ^ negated;
                let transposed: Vec<Filtering> = operands
                    .iter()
                    .map(|operand| operand.transpose_in(child_columns, context))
                    .collect();
                if transposed.iter().any(|op| op.is_constant(true)) {
                    Filtering::constant(!*negated)
                } else if transposed.iter().all(|op| op.is_constant(false)) {
                    Filtering::constant(*negated)
                } else {
                    Filtering::Or {
                        operands: transposed,
                        negated: *negated,
                    }
                }
            }
        }
    }

    /// Rewrites column references, leaving unmapped names untouched.
    /// Used by operations that rename columns to translate a parent filter
    /// into child terms.
    pub fn map_columns(&self, rename: &dyn Fn(&str) -> Option<String>) -> Filtering {
        match self {
            Filtering::True { .. } => self.clone(),
            Filtering::Literal {
                column,
                op,
                value,
                negated,
            } => Filtering::Literal {
                column: rename(column).unwrap_or_else(|| column.clone()),
                op: *op,
                value: value.clone(),
                negated: *negated,
            },
            Filtering::And { operands, negated } => Filtering::And {
                operands: operands.iter().map(|o| o.map_columns(rename)).collect(),
                negated: *negated,
            },
            Filtering::Or { operands, negated } => Filtering::Or {
                operands: operands.iter().map(|o| o.map_columns(rename)).collect(),
                negated: *negated,
            },
        }
    }

    /// Evaluates the filter against a row.
    ///
    /// A column missing from `structure` is a planner bug, not a filter
    /// result, and aborts with a panic.
    pub fn test(&self, row: &DataPoint, structure: &DataStructure) -> bool {
        match self {
            Filtering::True { negated } => !negated,
            Filtering::Literal {
                column,
                op,
                value,
                negated,
            } => {
                let index = structure.index_of(column).unwrap_or_else(|| {
                    panic!("filter references unknown column '{column}'")
                });
                let compared = row.get(index).compare(value).unwrap_or_else(|e| {
                    panic!("filter comparison failed on column '{column}': {e}")
                });
                let matched = match op {
                    CompareOp::Eq => compared == Cmp::Equal,
                    CompareOp::Gt => compared == Cmp::Greater,
                    CompareOp::Lt => compared == Cmp::Less,
                };
                matched ^ negated
            }
            Filtering::And { operands, negated } => {
                if *negated {
                    operands.iter().any(|op| !op.test(row, structure))
                } else {
                    operands.iter().all(|op| op.test(row, structure))
                }
            }
            Filtering::Or { operands, negated } => {
                if *negated {
                    operands.iter().all(|op| !op.test(row, structure))
                } else {
                    operands.iter().any(|op| op.test(row, structure))
                }
            }
        }
    }
}

impl fmt::Display for Filtering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filtering::True { negated } => f.write_str(if *negated { "FALSE" } else { "TRUE" }),
            Filtering::Literal {
                column,
                op,
                value,
                negated,
            } => {
                let symbol = match (op, negated) {
                    (CompareOp::Eq, false) => "=",
                    (CompareOp::Eq, true) => "!=",
                    (CompareOp::Gt, false) => ">",
                    (CompareOp::Gt, true) => "<=",
                    (CompareOp::Lt, false) => "<",
                    (CompareOp::Lt, true) => ">=",
                };
                write!(f, "{column}{symbol}{value}")
            }
            Filtering::And { operands, negated } => {
                write_operands(f, operands, "&", *negated)
            }
            Filtering::Or { operands, negated } => {
                write_operands(f, operands, "|", *negated)
            }
        }
    }
}

fn write_operands(
    f: &mut fmt::Formatter<'_>,
    operands: &[Filtering],
    separator: &str,
    negated: bool,
) -> fmt::Result {
    if negated {
        f.write_str("~")?;
    }
    f.write_str("(")?;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{operand}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, DataType};

    fn structure() -> DataStructure {
        DataStructure::builder()
            .add(Component::identifier("id", DataType::Integer))
            .add(Component::measure("amount", DataType::Integer))
            .build()
            .unwrap()
    }

    fn row(id: i64, amount: i64) -> DataPoint {
        DataPoint::new(vec![VtlValue::Integer(id), VtlValue::Integer(amount)])
    }

    #[test]
    fn literal_evaluation() {
        let structure = structure();
        assert!(Filtering::eq("id", 1).test(&row(1, 0), &structure));
        assert!(!Filtering::eq("id", 1).test(&row(2, 0), &structure));
        assert!(Filtering::gt("amount", 5).test(&row(0, 6), &structure));
        assert!(Filtering::ge("amount", 5).test(&row(0, 5), &structure));
        assert!(Filtering::le("amount", 5).test(&row(0, 5), &structure));
        assert!(!Filtering::lt("amount", 5).test(&row(0, 5), &structure));
        assert!(Filtering::neq("id", 1).test(&row(2, 0), &structure));
    }

    #[test]
    fn null_compares_below_literals() {
        let structure = structure();
        let null_row = DataPoint::new(vec![VtlValue::Null, VtlValue::Integer(0)]);
        assert!(Filtering::lt("id", 1).test(&null_row, &structure));
        assert!(!Filtering::eq("id", 1).test(&null_row, &structure));
    }

    #[test]
    fn negated_and_follows_de_morgan() {
        let structure = structure();
        let a = Filtering::eq("id", 1);
        let b = Filtering::gt("amount", 10);
        let negated_and = Filtering::and(vec![a.clone(), b.clone()]).not();
        let negated_or = Filtering::or(vec![a.clone(), b.clone()]).not();

        for point in [row(1, 20), row(1, 5), row(2, 20), row(2, 5)] {
            let ta = a.test(&point, &structure);
            let tb = b.test(&point, &structure);
            assert_eq!(negated_and.test(&point, &structure), !(ta && tb));
            assert_eq!(negated_or.test(&point, &structure), !(ta || tb));
        }
    }

    #[test]
    fn transpose_keeps_known_columns() {
        let columns: HashSet<String> = ["id".to_string()].into();
        let filter = Filtering::eq("id", 1);
        assert_eq!(filter.transpose(&columns), filter);
    }

    #[test]
    fn transpose_neutralizes_unknown_columns() {
        let columns: HashSet<String> = ["id".to_string()].into();
        let filter = Filtering::and(vec![
            Filtering::eq("id", 1),
            Filtering::gt("amount", 10),
        ]);
        let transposed = filter.transpose(&columns);
        assert_eq!(
            transposed,
            Filtering::and(vec![Filtering::eq("id", 1), Filtering::constant(true)])
        );
    }

    #[test]
    fn transpose_collapses_or_on_constant_true() {
        let columns: HashSet<String> = ["id".to_string()].into();
        let filter = Filtering::or(vec![
            Filtering::eq("id", 1),
            Filtering::gt("amount", 10),
        ]);
        assert_eq!(filter.transpose(&columns), Filtering::constant(true));
    }

    #[test]
    fn transposition_is_a_relaxation() {
        // For every filter F and child column set C, any row accepted by F
        // must also be accepted by transpose(F, C).
        let structure = structure();
        let columns: HashSet<String> = ["id".to_string()].into();
        let a = Filtering::eq("id", 1);
        let b = Filtering::gt("amount", 10);
        let filters = vec![
            Filtering::and(vec![a.clone(), b.clone()]),
            Filtering::or(vec![a.clone(), b.clone()]),
            Filtering::and(vec![a.clone(), b.clone()]).not(),
            Filtering::or(vec![a.clone(), b.clone()]).not(),
            Filtering::and(vec![a.clone(), Filtering::or(vec![b.clone(), a.clone()]).not()]),
            Filtering::or(vec![Filtering::and(vec![a.clone(), b.clone()]).not(), b.clone()]).not(),
            b.clone().not(),
        ];
        for filter in filters {
            let transposed = filter.transpose(&columns);
            for id in 0..4 {
                for amount in [0, 10, 11, 42] {
                    let point = row(id, amount);
                    if filter.test(&point, &structure) {
                        assert!(
                            transposed.test(&point, &structure),
                            "transpose narrowed {filter} to {transposed} for {point:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn display_matches_operator_symbols() {
        let filter = Filtering::and(vec![
            Filtering::eq("id", 1),
            Filtering::ge("amount", 10),
        ])
        .not();
        assert_eq!(filter.to_string(), "~(id=1&amount>=10)");
    }
}
