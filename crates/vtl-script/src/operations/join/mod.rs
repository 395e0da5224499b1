//! Join operation: merges N child operations on their shared identifiers.
//!
//! The join key is the set of identifier components shared by name and type
//! across every operand, computed once at construction. Every child is
//! pulled sorted ascending by the key, and the N-way join is realized as a
//! strict left-to-right fold of pairwise sort-merges, each step's output
//! staying in key order so it can feed the next step directly.

mod merge;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use vtl_model::prelude::*;

use crate::operations::join::merge::{merge_join, StepPlan};
use crate::operations::{default_rows, DatasetOperation, OperationRef};
use crate::stream::{filter_locally, sort_locally, StreamTrace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Outer,
}

#[derive(Debug)]
pub struct JoinOperation {
    children: Vec<OperationRef>,
    structure: DataStructure,
    join_type: JoinType,
    key_order: Ordering,
    steps: Vec<StepPlan>,
}

impl JoinOperation {
    pub fn new(children: Vec<OperationRef>, join_type: JoinType) -> Result<Self> {
        if children.is_empty() {
            return Err(VtlError::Schema(
                "join requires at least one operand".to_string(),
            ));
        }

        let key = join_key(&children)?;
        let key_order = Ordering::ascending(key.iter().map(|c| c.name.clone()));
        let key_names: HashSet<String> = key.iter().map(|c| c.name.clone()).collect();

        // Fold the structures left to right, planning each merge step as we
        // go so compute_rows stays infallible.
        let mut structure = children[0].structure().clone();
        let mut steps = Vec::with_capacity(children.len().saturating_sub(1));
        for child in &children[1..] {
            let right = child.structure();
            let mut components = structure.components().to_vec();
            let mut right_map = Vec::with_capacity(right.len());
            for (from, component) in right.components().iter().enumerate() {
                if key_names.contains(&component.name) {
                    let to = structure.index_of(&component.name).unwrap_or_else(|| {
                        panic!("join key column '{}' missing from merged structure", component.name)
                    });
                    right_map.push((from, to));
                } else {
                    if structure.contains(&component.name) {
                        return Err(VtlError::Schema(format!(
                            "join operands both carry non-key component '{}'",
                            component.name
                        )));
                    }
                    right_map.push((from, components.len()));
                    components.push(component.clone());
                }
            }
            let merged = DataStructure::builder().add_all(components).build()?;
            steps.push(StepPlan {
                left_key: key_positions(&structure, &key_order),
                right_key: key_positions(right, &key_order),
                right_map,
                out_width: merged.len(),
            });
            structure = merged;
        }

        Ok(Self {
            children,
            structure,
            join_type,
            key_order,
            steps,
        })
    }

    pub fn key_order(&self) -> &Ordering {
        &self.key_order
    }
}

/// The shared identifier components, in the first operand's column order.
/// Sharing requires the same name and type; a name carried with two types
/// is a schema violation, not a silent drop.
fn join_key(children: &[OperationRef]) -> Result<Vec<Component>> {
    let mut key = Vec::new();
    for component in children[0].structure().identifiers() {
        let mut shared = true;
        for child in &children[1..] {
            match child.structure().component(&component.name) {
                Some(other) if other.is_identifier() => {
                    if other.data_type != component.data_type {
                        return Err(VtlError::Schema(format!(
                            "identifier '{}' carries {} on one operand and {} on another",
                            component.name, component.data_type, other.data_type
                        )));
                    }
                }
                _ => {
                    shared = false;
                    break;
                }
            }
        }
        if shared {
            key.push(component.clone());
        }
    }
    if key.is_empty() {
        return Err(VtlError::Schema(
            "join operands share no identifier components".to_string(),
        ));
    }
    Ok(key)
}

// join_key guarantees every operand carries the key columns; a miss here
// is a planner bug and aborts rather than corrupting the merge layout.
fn key_positions(structure: &DataStructure, key_order: &Ordering) -> Vec<usize> {
    key_order
        .columns()
        .map(|(name, _)| {
            structure
                .index_of(name)
                .unwrap_or_else(|| panic!("join key column '{name}' missing from operand"))
        })
        .collect()
}

impl Dataset for JoinOperation {
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

    // A join over one operand is a passthrough; anything wider changes
    // cardinality unpredictably and reports unknown.
    fn size(&self) -> Option<u64> {
        if self.children.len() == 1 {
            self.children[0].size()
        } else {
            None
        }
    }

    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        if self.children.len() == 1 {
            self.children[0].distinct_values_count()
        } else {
            None
        }
    }
}

impl DatasetOperation for JoinOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        // The key columns are the only ones every operand carries.
        let key_columns = self
            .key_order
            .columns()
            .map(|(name, _)| name.to_string())
            .collect();
        filtering.transpose(&key_columns)
    }

    fn required_ordering(&self, _ordering: &Ordering) -> Option<Ordering> {
        // The merge dictates the child order regardless of the request.
        Some(self.key_order.clone())
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> DataPointStream {
        let mut transposed_exactly = true;
        let mut streams = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let child_columns = child.structure().name_set();
            let child_filtering = filtering.transpose(&child_columns);
            transposed_exactly &= child_filtering == *filtering;
            streams.push(child.compute_rows(&self.key_order, &child_filtering, &child_columns));
        }

        let filtered_locally = !transposed_exactly;
        let sorted_locally = !self.key_order.starts_with(ordering);
        StreamTrace {
            operation: "join",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: Some(&self.key_order),
            child_filtering: &self.required_filtering(filtering),
            sorted_locally,
            filtered_locally,
        }
        .log();

        let mut streams = streams.into_iter();
        // Non-empty by construction.
        let mut joined: DataPointStream = match streams.next() {
            Some(stream) => stream,
            None => Box::new(std::iter::empty()),
        };
        for (stream, plan) in streams.zip(self.steps.iter()) {
            joined = merge_join(joined, stream, plan.clone(), self.join_type);
        }

        if filtered_locally {
            joined = filter_locally(joined, filtering, &self.structure);
        }
        if sorted_locally {
            joined = sort_locally(joined, ordering, &self.structure, None);
        }
        joined
    }
}
