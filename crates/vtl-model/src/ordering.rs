//! Ordering: a column-to-direction mapping and the row comparator derived
//! from it.

use std::cmp::Ordering as Cmp;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datapoint::DataPoint;
use crate::structure::DataStructure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordered list of `(column, direction)` pairs. An empty ordering places no
/// constraint on row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    columns: Vec<(String, Direction)>,
}

impl Ordering {
    pub fn new(columns: Vec<(String, Direction)>) -> Self {
        Self { columns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ascending<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|name| (name.into(), Direction::Ascending))
                .collect(),
        }
    }

    /// The default ordering of a structure: identifiers first, then
    /// measures, then attributes, each group sorted by name, all ascending.
    ///
    /// Deterministic for equal structures; producers and consumers rely on
    /// this to agree on a sort order without explicit negotiation.
    pub fn default_for(structure: &DataStructure) -> Self {
        let mut components: Vec<_> = structure
            .components()
            .iter()
            .map(|c| (c.role, c.name.clone()))
            .collect();
        components.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Self {
            columns: components
                .into_iter()
                .map(|(_, name)| (name, Direction::Ascending))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.columns.iter().map(|(name, dir)| (name.as_str(), *dir))
    }

    /// True when sorting by `self` implies sorting by `prefix`.
    pub fn starts_with(&self, prefix: &Ordering) -> bool {
        prefix.columns.len() <= self.columns.len()
            && self.columns[..prefix.columns.len()] == prefix.columns[..]
    }

    /// Rewrites column references, dropping the ordering (`None`) when a
    /// referenced column cannot be translated.
    pub fn map_columns(&self, rename: &dyn Fn(&str) -> Option<String>) -> Option<Ordering> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for (name, direction) in &self.columns {
            columns.push((rename(name)?, *direction));
        }
        Some(Ordering { columns })
    }

    /// Compares two rows of the same structure column by column.
    ///
    /// Values compare null-first; a descending column reverses its result.
    /// Rows equal on every ordered column compare as equal, their relative
    /// order is unspecified. Referencing a column absent from `structure`
    /// is a planner bug and aborts with a panic.
    pub fn compare(&self, a: &DataPoint, b: &DataPoint, structure: &DataStructure) -> Cmp {
        for (column, direction) in &self.columns {
            let index = structure
                .index_of(column)
                .unwrap_or_else(|| panic!("ordering references unknown column '{column}'"));
            let compared = a.get(index).compare(b.get(index)).unwrap_or_else(|e| {
                panic!("ordering comparison failed on column '{column}': {e}")
            });
            let compared = match direction {
                Direction::Ascending => compared,
                Direction::Descending => compared.reverse(),
            };
            if compared != Cmp::Equal {
                return compared;
            }
        }
        Cmp::Equal
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return f.write_str("any");
        }
        for (i, (name, direction)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let arrow = match direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            write!(f, "{name} {arrow}")?;
        }
        Ok(())
    }
}
