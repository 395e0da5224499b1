//! Keep operation: retains the identifiers plus an explicit set of
//! components, dropping everything else.

use std::collections::{HashMap, HashSet};

use vtl_model::prelude::*;

use crate::operations::{default_rows, removal_indexes, project_away, DatasetOperation, OperationRef};
use crate::stream::StreamTrace;

#[derive(Debug)]
pub struct KeepOperation {
    child: OperationRef,
    structure: DataStructure,
    removed: Vec<usize>,
}

impl KeepOperation {
    pub fn new(child: OperationRef, components: HashSet<String>) -> Result<Self> {
        if components.is_empty() {
            return Err(VtlError::Schema(
                "keep requires at least one component".to_string(),
            ));
        }
        for name in &components {
            if !child.structure().contains(name) {
                return Err(VtlError::Schema(format!(
                    "keep references unknown component '{name}'"
                )));
            }
        }

        // Identifiers survive regardless; column positions are recomputed
        // by the structure builder.
        let structure = DataStructure::builder()
            .add_all(
                child
                    .structure()
                    .components()
                    .iter()
                    .filter(|c| c.is_identifier() || components.contains(&c.name))
                    .cloned(),
            )
            .build()?;
        let removed = removal_indexes(child.structure(), &structure);
        Ok(Self {
            child,
            structure,
            removed,
        })
    }
}

impl Dataset for KeepOperation {
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

    fn size(&self) -> Option<u64> {
        self.child.size()
    }

    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        self.child.distinct_values_count()
    }
}

impl DatasetOperation for KeepOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        filtering.transpose(&self.child.structure().name_set())
    }

    fn required_ordering(&self, ordering: &Ordering) -> Option<Ordering> {
        // Kept columns exist under the same name in the child.
        Some(ordering.clone())
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> DataPointStream {
        let child_filtering = self.required_filtering(filtering);
        let child_ordering = ordering.clone();
        StreamTrace {
            operation: "keep",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: Some(&child_ordering),
            child_filtering: &child_filtering,
            sorted_locally: false,
            filtered_locally: false,
        }
        .log();
        let stream = self.child.compute_rows(
            &child_ordering,
            &child_filtering,
            &self.child.structure().name_set(),
        );
        project_away(stream, self.removed.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::operations::WrapperOperation;
    use vtl_model::component::{Component, DataType};

    fn child() -> OperationRef {
        let structure = DataStructure::builder()
            .add(Component::identifier("id", DataType::Integer))
            .add(Component::measure("amount", DataType::Integer))
            .add(Component::attribute("note", DataType::String))
            .build()
            .unwrap();
        let rows = vec![
            DataPoint::new(vec![
                VtlValue::Integer(1),
                VtlValue::Integer(10),
                VtlValue::Str("a".into()),
            ]),
            DataPoint::new(vec![
                VtlValue::Integer(2),
                VtlValue::Integer(20),
                VtlValue::Str("b".into()),
            ]),
        ];
        Rc::new(WrapperOperation::new(Rc::new(
            InMemoryDataset::new(structure, rows).unwrap(),
        )))
    }

    #[test]
    fn keeps_identifiers_and_named_components() {
        let keep = KeepOperation::new(child(), ["amount".to_string()].into()).unwrap();
        let names: Vec<_> = keep.structure().names().collect();
        assert_eq!(names, ["id", "amount"]);
    }

    #[test]
    fn identifier_values_are_preserved() {
        let keep = KeepOperation::new(child(), ["note".to_string()].into()).unwrap();
        let rows: Vec<DataPoint> = keep.rows().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), &VtlValue::Integer(1));
        assert_eq!(rows[0].get(1), &VtlValue::Str("a".into()));
        assert_eq!(rows[1].get(0), &VtlValue::Integer(2));
    }

    #[test]
    fn unknown_component_is_a_schema_violation() {
        let err = KeepOperation::new(child(), ["missing".to_string()].into()).unwrap_err();
        assert!(matches!(err, VtlError::Schema(_)));
    }

    #[test]
    fn empty_component_set_is_rejected() {
        let err = KeepOperation::new(child(), HashSet::new()).unwrap_err();
        assert!(matches!(err, VtlError::Schema(_)));
    }
}
