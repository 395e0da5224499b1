//! Data points: fixed-width positional rows aligned to a data structure.

use serde::{Deserialize, Serialize};

use crate::value::VtlValue;

/// Ordered sequence of scalar values. The width always equals the size of
/// the owning `DataStructure`; mutation happens only during row
/// construction (projection, join merging), rows are immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    values: Vec<VtlValue>,
}

impl DataPoint {
    pub fn new(values: Vec<VtlValue>) -> Self {
        Self { values }
    }

    /// Null-filled template of the given width, selectively overwritten by
    /// row builders such as the join merger.
    pub fn nulls(width: usize) -> Self {
        Self {
            values: vec![VtlValue::Null; width],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> &VtlValue {
        &self.values[index]
    }

    pub fn set(&mut self, index: usize, value: VtlValue) {
        self.values[index] = value;
    }

    pub fn push(&mut self, value: VtlValue) {
        self.values.push(value);
    }

    /// Removes the positions listed in `indexes`, which must be sorted in
    /// descending order so removal does not shift later positions.
    pub fn remove_descending(&mut self, indexes: &[usize]) {
        for &index in indexes {
            self.values.remove(index);
        }
    }

    pub fn values(&self) -> &[VtlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<VtlValue> {
        self.values
    }
}

impl FromIterator<VtlValue> for DataPoint {
    fn from_iter<T: IntoIterator<Item = VtlValue>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
