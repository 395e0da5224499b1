//! Filter operation: restricts the child to rows matching a predicate.
//!
//! The predicate is combined with whatever filter the parent requests and
//! pushed down as a single conjunction, so the child sees one filter and
//! this node does no row work of its own.

use std::collections::{HashMap, HashSet};

use vtl_model::prelude::*;

use crate::operations::{default_rows, DatasetOperation, OperationRef};
use crate::stream::StreamTrace;

#[derive(Debug)]
pub struct FilterOperation {
    child: OperationRef,
    structure: DataStructure,
    predicate: Filtering,
}

impl FilterOperation {
    pub fn new(child: OperationRef, predicate: Filtering) -> Result<Self> {
        validate_columns(&predicate, child.structure())?;
        let structure = child.structure().clone();
        Ok(Self {
            child,
            structure,
            predicate,
        })
    }
}

/// Rejects predicates over columns the child does not carry, and literals
/// whose type can never compare with the column's declared type, before
/// either can reach `Filtering::test`, which treats both as planner bugs.
fn validate_columns(filtering: &Filtering, structure: &DataStructure) -> Result<()> {
    match filtering {
        Filtering::True { .. } => Ok(()),
        Filtering::Literal { column, value, .. } => {
            let component = structure.component(column).ok_or_else(|| {
                VtlError::Schema(format!(
                    "filter references unknown component '{column}'"
                ))
            })?;
            match value.data_type() {
                // Null compares with every type.
                None => Ok(()),
                Some(literal) if comparable(component.data_type, literal) => Ok(()),
                Some(literal) => Err(VtlError::TypeMismatch {
                    left: component.data_type,
                    right: literal,
                }),
            }
        }
        Filtering::And { operands, .. } | Filtering::Or { operands, .. } => operands
            .iter()
            .try_for_each(|operand| validate_columns(operand, structure)),
    }
}

/// Same type, or both numeric (integers and floats compare in a common
/// domain).
fn comparable(column: DataType, literal: DataType) -> bool {
    let numeric = |t: DataType| matches!(t, DataType::Integer | DataType::Float);
    column == literal || (numeric(column) && numeric(literal))
}

impl Dataset for FilterOperation {
    fn structure(&self) -> &DataStructure {
        &self.structure
    }

    fn rows(&self) -> DataPointStream {
        default_rows(self)
    }

    fn rows_where(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &HashSet<String>,
    ) -> Option<DataPointStream> {
        Some(self.compute_rows(ordering, filtering, columns))
    }

    // Size hints do not survive a filter; distinct counts remain upper
    // bounds and are still useful for planning.
    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        self.child.distinct_values_count()
    }
}

impl DatasetOperation for FilterOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        Filtering::and(vec![self.predicate.clone(), filtering.clone()])
    }

    fn required_ordering(&self, ordering: &Ordering) -> Option<Ordering> {
        Some(ordering.clone())
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> DataPointStream {
        let child_filtering = self.required_filtering(filtering);
        StreamTrace {
            operation: "filter",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: Some(ordering),
            child_filtering: &child_filtering,
            sorted_locally: false,
            filtered_locally: false,
        }
        .log();
        self.child
            .compute_rows(ordering, &child_filtering, &self.structure.name_set())
    }
}
