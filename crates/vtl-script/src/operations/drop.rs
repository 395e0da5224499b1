//! Drop operation: the complement of keep, removing named measures and
//! attributes from the child.

use std::collections::{HashMap, HashSet};

use vtl_model::prelude::*;

use crate::operations::{default_rows, project_away, removal_indexes, DatasetOperation, OperationRef};
use crate::stream::StreamTrace;

#[derive(Debug)]
pub struct DropOperation {
    child: OperationRef,
    structure: DataStructure,
    removed: Vec<usize>,
}

impl DropOperation {
    pub fn new(child: OperationRef, components: HashSet<String>) -> Result<Self> {
        for name in &components {
            match child.structure().component(name) {
                None => {
                    return Err(VtlError::Schema(format!(
                        "drop references unknown component '{name}'"
                    )))
                }
                Some(component) if component.is_identifier() => {
                    return Err(VtlError::Schema(format!(
                        "cannot drop identifier '{name}'"
                    )))
                }
                Some(_) => {}
            }
        }

        let structure = DataStructure::builder()
            .add_all(
                child
                    .structure()
                    .components()
                    .iter()
                    .filter(|c| !components.contains(&c.name))
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

impl Dataset for DropOperation {
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

impl DatasetOperation for DropOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        // Every surviving column exists in the child under the same name.
        filtering.clone()
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
        StreamTrace {
            operation: "drop",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: Some(ordering),
            child_filtering: filtering,
            sorted_locally: false,
            filtered_locally: false,
        }
        .log();
        let stream = self
            .child
            .compute_rows(ordering, filtering, &self.child.structure().name_set());
        project_away(stream, self.removed.clone())
    }
}
