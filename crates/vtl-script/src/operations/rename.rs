//! Rename operation: changes component names, leaving positions, types,
//! roles and values untouched.
//!
//! Parent requests arrive in the new vocabulary and are translated back to
//! the child's before pushdown, so both the ordering and the filtering
//! survive a rename unchanged in meaning.

use std::collections::{HashMap, HashSet};

use vtl_model::component::Component;
use vtl_model::prelude::*;

use crate::operations::{default_rows, DatasetOperation, OperationRef};
use crate::stream::StreamTrace;

#[derive(Debug)]
pub struct RenameOperation {
    child: OperationRef,
    structure: DataStructure,
    /// new name -> old name
    reverse: HashMap<String, String>,
}

impl RenameOperation {
    /// `mapping` maps old component names to new ones.
    pub fn new(child: OperationRef, mapping: HashMap<String, String>) -> Result<Self> {
        for old in mapping.keys() {
            if !child.structure().contains(old) {
                return Err(VtlError::Schema(format!(
                    "rename references unknown component '{old}'"
                )));
            }
        }

        // Collisions between a new name and a surviving old one are caught
        // by the duplicate check of the structure builder.
        let structure = DataStructure::builder()
            .add_all(child.structure().components().iter().map(|c| Component {
                name: mapping.get(&c.name).cloned().unwrap_or_else(|| c.name.clone()),
                data_type: c.data_type,
                role: c.role,
            }))
            .build()?;

        let reverse = mapping.into_iter().map(|(old, new)| (new, old)).collect();
        Ok(Self {
            child,
            structure,
            reverse,
        })
    }

    fn to_child_name(&self, name: &str) -> Option<String> {
        Some(
            self.reverse
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
        )
    }
}

impl Dataset for RenameOperation {
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
        let counts = self.child.distinct_values_count()?;
        Some(
            counts
                .into_iter()
                .map(|(old, count)| {
                    let new = self
                        .structure
                        .names()
                        .zip(self.child.structure().names())
                        .find(|(_, child_name)| *child_name == old)
                        .map(|(name, _)| name.to_string())
                        .unwrap_or(old);
                    (new, count)
                })
                .collect(),
        )
    }
}

impl DatasetOperation for RenameOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        filtering.map_columns(&|name| self.to_child_name(name))
    }

    fn required_ordering(&self, ordering: &Ordering) -> Option<Ordering> {
        ordering.map_columns(&|name| self.to_child_name(name))
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> DataPointStream {
        let child_filtering = self.required_filtering(filtering);
        // Every new name translates, so the ordering always survives.
        let child_ordering = self
            .required_ordering(ordering)
            .unwrap_or_else(Ordering::empty);
        StreamTrace {
            operation: "rename",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: Some(&child_ordering),
            child_filtering: &child_filtering,
            sorted_locally: false,
            filtered_locally: false,
        }
        .log();
        self.child.compute_rows(
            &child_ordering,
            &child_filtering,
            &self.child.structure().name_set(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::operations::WrapperOperation;
    use vtl_model::component::DataType;

    fn child() -> OperationRef {
        let structure = DataStructure::builder()
            .add(Component::identifier("id", DataType::Integer))
            .add(Component::measure("amount", DataType::Integer))
            .build()
            .unwrap();
        let rows = vec![
            DataPoint::new(vec![VtlValue::Integer(2), VtlValue::Integer(20)]),
            DataPoint::new(vec![VtlValue::Integer(1), VtlValue::Integer(10)]),
        ];
        Rc::new(WrapperOperation::new(Rc::new(
            InMemoryDataset::new(structure, rows).unwrap(),
        )))
    }

    fn rename() -> RenameOperation {
        RenameOperation::new(child(), [("amount".to_string(), "total".to_string())].into())
            .unwrap()
    }

    #[test]
    fn structure_carries_new_names_same_roles() {
        let rename = rename();
        let names: Vec<_> = rename.structure().names().collect();
        assert_eq!(names, ["id", "total"]);
        assert!(rename.structure().component("total").unwrap().is_measure());
    }

    #[test]
    fn requests_translate_to_the_old_vocabulary() {
        let rename = rename();
        assert_eq!(
            rename.required_ordering(&Ordering::ascending(["total"])),
            Some(Ordering::ascending(["amount"]))
        );
        assert_eq!(
            rename.required_filtering(&Filtering::gt("total", 10)),
            Filtering::gt("amount", 10)
        );
    }

    #[test]
    fn rows_flow_through_sorted_and_filtered() {
        let rename = rename();
        let stream = rename.compute_rows(
            &Ordering::ascending(["total"]),
            &Filtering::gt("total", 5),
            &rename.structure().name_set(),
        );
        let rows: Vec<DataPoint> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), &VtlValue::Integer(10));
        assert_eq!(rows[1].get(1), &VtlValue::Integer(20));
    }

    #[test]
    fn name_collisions_are_rejected() {
        let err = RenameOperation::new(
            child(),
            [("amount".to_string(), "id".to_string())].into(),
        )
        .unwrap_err();
        assert!(matches!(err, VtlError::Schema(_)));
    }

    #[test]
    fn unknown_source_is_a_schema_violation() {
        let err = RenameOperation::new(
            child(),
            [("missing".to_string(), "x".to_string())].into(),
        )
        .unwrap_err();
        assert!(matches!(err, VtlError::Schema(_)));
    }
}
