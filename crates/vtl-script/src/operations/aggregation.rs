//! Aggregation operation: folds one measure per group of identifier values.
//!
//! The child is pulled sorted by the group columns, so groups arrive
//! contiguously and a single accumulator per group suffices. The result
//! carries the group identifiers plus the folded measure.

use std::collections::{HashMap, HashSet};

use vtl_model::component::Component;
use vtl_model::prelude::*;

use crate::functions::{Accumulator, AggregateKind};
use crate::operations::{default_rows, DatasetOperation, OperationRef};
use crate::stream::{filter_locally, sort_locally, StreamTrace};

#[derive(Debug)]
pub struct AggregationOperation {
    child: OperationRef,
    structure: DataStructure,
    group_indexes: Vec<usize>,
    input_index: usize,
    kind: AggregateKind,
    key_order: Ordering,
}

impl AggregationOperation {
    pub fn new(
        child: OperationRef,
        group_by: Vec<String>,
        input: &str,
        output: impl Into<String>,
        kind: AggregateKind,
    ) -> Result<Self> {
        if group_by.is_empty() {
            return Err(VtlError::Schema(
                "aggregation requires at least one group column".to_string(),
            ));
        }
        let mut group_indexes = Vec::with_capacity(group_by.len());
        let mut group_components = Vec::with_capacity(group_by.len());
        for name in &group_by {
            let index = child.structure().index_of(name);
            match index.and_then(|i| child.structure().get(i)) {
                Some(component) if component.is_identifier() => {
                    group_components.push(component.clone());
                    // index is Some whenever the component lookup succeeded.
                    group_indexes.push(index.unwrap_or_default());
                }
                Some(_) => {
                    return Err(VtlError::Schema(format!(
                        "group column '{name}' is not an identifier"
                    )))
                }
                None => {
                    return Err(VtlError::Schema(format!(
                        "aggregation references unknown component '{name}'"
                    )))
                }
            }
        }

        let input_index = child.structure().index_of(input).ok_or_else(|| {
            VtlError::Schema(format!("aggregation references unknown component '{input}'"))
        })?;
        let input_type = child.structure().components()[input_index].data_type;
        let output_type = kind.output_type(input_type)?;

        let structure = DataStructure::builder()
            .add_all(group_components)
            .add(Component::measure(output, output_type))
            .build()?;
        let key_order = Ordering::ascending(group_by);
        Ok(Self {
            child,
            structure,
            group_indexes,
            input_index,
            kind,
            key_order,
        })
    }
}

impl Dataset for AggregationOperation {
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

    // The group count is unknown until the fold runs; distinct counts of
    // the group columns remain valid upper bounds.
    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        let counts = self.child.distinct_values_count()?;
        Some(
            counts
                .into_iter()
                .filter(|(name, _)| self.structure.contains(name))
                .collect(),
        )
    }
}

impl DatasetOperation for AggregationOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        filtering.transpose(&self.child.structure().name_set())
    }

    fn required_ordering(&self, _ordering: &Ordering) -> Option<Ordering> {
        // The fold dictates the child order regardless of the request.
        Some(self.key_order.clone())
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> DataPointStream {
        let child_filtering = self.required_filtering(filtering);
        let filtered_locally = child_filtering != *filtering;
        let sorted_locally = !self.key_order.starts_with(ordering);
        StreamTrace {
            operation: "aggregation",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: Some(&self.key_order),
            child_filtering: &child_filtering,
            sorted_locally,
            filtered_locally,
        }
        .log();

        let stream = self.child.compute_rows(
            &self.key_order,
            &child_filtering,
            &self.child.structure().name_set(),
        );
        let mut folded: DataPointStream = Box::new(GroupedFold {
            inner: stream,
            group_indexes: self.group_indexes.clone(),
            input_index: self.input_index,
            kind: self.kind,
            current: None,
            done: false,
        });

        if filtered_locally {
            folded = filter_locally(folded, filtering, &self.structure);
        }
        if sorted_locally {
            folded = sort_locally(folded, ordering, &self.structure, None);
        }
        folded
    }
}

struct GroupedFold {
    inner: DataPointStream,
    group_indexes: Vec<usize>,
    input_index: usize,
    kind: AggregateKind,
    current: Option<(Vec<VtlValue>, Box<dyn Accumulator>)>,
    done: bool,
}

impl GroupedFold {
    fn key_of(&self, row: &DataPoint) -> Vec<VtlValue> {
        self.group_indexes
            .iter()
            .map(|&index| row.get(index).clone())
            .collect()
    }

    fn emit(&mut self) -> Option<DataPoint> {
        let (key, mut accumulator) = self.current.take()?;
        let mut values = key;
        values.push(accumulator.finish());
        Some(DataPoint::new(values))
    }
}

impl Iterator for GroupedFold {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.inner.next() {
                Some(Ok(row)) => {
                    let key = self.key_of(&row);
                    let boundary = match &self.current {
                        Some((current_key, _)) => *current_key != key,
                        None => {
                            self.current = Some((key.clone(), self.kind.accumulator()));
                            false
                        }
                    };
                    let finished = if boundary { self.emit() } else { None };
                    if boundary {
                        self.current = Some((key, self.kind.accumulator()));
                    }
                    if let Some((_, accumulator)) = &mut self.current {
                        if let Err(e) = accumulator.update(row.get(self.input_index)) {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                    if let Some(finished) = finished {
                        return Some(Ok(finished));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.emit().map(Ok);
                }
            }
        }
    }
}
