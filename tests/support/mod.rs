//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::rc::Rc;

use vtl::prelude::*;
use vtl::script::operations::{OperationRef, WrapperOperation};

pub fn measures_dataset(measure: &str, rows: Vec<(i64, i64)>) -> InMemoryDataset {
    let structure = DataStructure::builder()
        .add(Component::identifier("id", DataType::Integer))
        .add(Component::measure(measure, DataType::Integer))
        .build()
        .unwrap();
    let rows = rows
        .into_iter()
        .map(|(id, value)| DataPoint::new(vec![VtlValue::Integer(id), VtlValue::Integer(value)]))
        .collect();
    InMemoryDataset::new(structure, rows).unwrap()
}

pub fn operand(measure: &str, rows: Vec<(i64, i64)>) -> OperationRef {
    Rc::new(WrapperOperation::new(Rc::new(measures_dataset(measure, rows))))
}

pub fn collect(stream: DataPointStream) -> Vec<Vec<VtlValue>> {
    stream
        .map(|row| row.unwrap().into_values())
        .collect()
}

/// Dataset that claims to honor any request but serves its rows verbatim,
/// simulating a source that lies about the sort contract.
pub struct LyingDataset {
    pub inner: InMemoryDataset,
}

impl Dataset for LyingDataset {
    fn structure(&self) -> &DataStructure {
        self.inner.structure()
    }

    fn rows(&self) -> DataPointStream {
        self.inner.rows()
    }

    fn rows_where(
        &self,
        _ordering: &Ordering,
        _filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> Option<DataPointStream> {
        Some(self.inner.rows())
    }
}
