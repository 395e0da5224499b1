//! The dataset streaming contract.
//!
//! A dataset produces fresh, independent, lazy row sequences. The
//! three-argument form lets an implementation serve a pre-sorted,
//! pre-filtered stream; returning `None` is not an error but the documented
//! signal that the caller must sort and filter on its own. When `Some` is
//! returned it is a binding contract: the stream is sorted by the requested
//! ordering, every element satisfies the filter, and rows retain at least
//! the requested columns.

use std::cmp::Ordering as Cmp;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::datapoint::DataPoint;
use crate::error::Result;
use crate::filtering::Filtering;
use crate::ordering::Ordering;
use crate::structure::DataStructure;

/// Lazy row sequence. An `Err` element terminates the sequence; consumers
/// must not pull past it.
pub type DataPointStream = Box<dyn Iterator<Item = Result<DataPoint>>>;

pub trait Dataset {
    fn structure(&self) -> &DataStructure;

    /// A new independent stream in the dataset's natural order.
    fn rows(&self) -> DataPointStream;

    /// A new independent stream, sorted and filtered by the implementation
    /// when it can guarantee the contract; `None` otherwise.
    fn rows_where(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &HashSet<String>,
    ) -> Option<DataPointStream>;

    /// Best-effort row count, for planning only.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Best-effort count of distinct values per column, for planning only.
    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        None
    }
}

impl std::fmt::Debug for dyn Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("structure", self.structure())
            .finish_non_exhaustive()
    }
}

/// Fully materialized dataset backing connectors and tests.
///
/// Serves sorted and filtered streams unless `without_pushdown` was used,
/// in which case `rows_where` always declines and callers fall back to
/// their local sort/filter path.
#[derive(Debug)]
pub struct InMemoryDataset {
    structure: DataStructure,
    rows: Rc<Vec<DataPoint>>,
    pushdown: bool,
}

impl InMemoryDataset {
    pub fn new(structure: DataStructure, rows: Vec<DataPoint>) -> Result<Self> {
        for row in &rows {
            if row.len() != structure.len() {
                return Err(crate::error::VtlError::Schema(format!(
                    "row width {} does not match structure width {}",
                    row.len(),
                    structure.len()
                )));
            }
        }
        Ok(Self {
            structure,
            rows: Rc::new(rows),
            pushdown: true,
        })
    }

    /// Simulates a source that cannot serve sorted or filtered streams.
    pub fn without_pushdown(mut self) -> Self {
        self.pushdown = false;
        self
    }
}

impl Dataset for InMemoryDataset {
    fn structure(&self) -> &DataStructure {
        &self.structure
    }

    fn rows(&self) -> DataPointStream {
        let rows = Rc::clone(&self.rows);
        let len = rows.len();
        Box::new((0..len).map(move |i| Ok(rows[i].clone())))
    }

    fn rows_where(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> Option<DataPointStream> {
        if !self.pushdown {
            return None;
        }
        let mut rows: Vec<DataPoint> = self
            .rows
            .iter()
            .filter(|row| filtering.test(row, &self.structure))
            .cloned()
            .collect();
        rows.sort_by(|a, b| ordering.compare(a, b, &self.structure));
        Some(Box::new(rows.into_iter().map(Ok)))
    }

    fn size(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        let mut counts = HashMap::with_capacity(self.structure.len());
        for (index, component) in self.structure.components().iter().enumerate() {
            let mut values: Vec<_> = self.rows.iter().map(|row| row.get(index)).collect();
            values.sort_by(|a, b| a.compare(b).unwrap_or(Cmp::Equal));
            values.dedup_by(|a, b| a.compare(b).unwrap_or(Cmp::Equal) == Cmp::Equal);
            counts.insert(component.name.clone(), values.len() as u64);
        }
        Some(counts)
    }
}
