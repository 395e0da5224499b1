//! The operation DAG.
//!
//! Every transformation is a node over zero or more child operations.
//! A node derives its own structure once, translates the ordering and
//! filtering requirements of its parent into the weakest requirement its
//! children must satisfy, pulls from the children accordingly, and applies
//! whatever work remains locally. Children are shared (`Rc`) because a
//! script can reference the same dataset from several places; the graph is
//! acyclic by construction.

use std::rc::Rc;

use vtl_model::prelude::*;

pub mod aggregation;
pub mod calc;
pub mod drop;
pub mod filter;
pub mod join;
pub mod keep;
pub mod rename;
pub mod wrapper;

pub use aggregation::AggregationOperation;
pub use calc::CalcOperation;
pub use drop::DropOperation;
pub use filter::FilterOperation;
pub use join::{JoinOperation, JoinType};
pub use keep::KeepOperation;
pub use rename::RenameOperation;
pub use wrapper::WrapperOperation;

/// Contract of every node in the operation DAG.
///
/// `compute_rows` must return a stream that satisfies the requested
/// ordering and filtering; unlike `Dataset::rows_where` it may not decline,
/// falling back to local work instead.
pub trait DatasetOperation: Dataset {
    /// The weakest filter a child must satisfy so that this node can serve
    /// its parent's filter. Always a relaxation of the argument.
    fn required_filtering(&self, filtering: &Filtering) -> Filtering;

    /// The child ordering equivalent to the requested ordering, or `None`
    /// when the request cannot be translated and the node has to sort
    /// locally.
    fn required_ordering(&self, ordering: &Ordering) -> Option<Ordering>;

    /// Computes the node's rows for the requested ordering, filtering and
    /// column set.
    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &std::collections::HashSet<String>,
    ) -> DataPointStream;
}

impl std::fmt::Debug for dyn DatasetOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetOperation")
            .field("structure", self.structure())
            .finish_non_exhaustive()
    }
}

/// Pulls the node's rows in the default order with no filter, the
/// `Dataset::rows` behavior shared by all operations.
pub(crate) fn default_rows(operation: &dyn DatasetOperation) -> DataPointStream {
    let structure = operation.structure();
    operation.compute_rows(
        &Ordering::default_for(structure),
        &Filtering::all(),
        &structure.name_set(),
    )
}

/// Positions of `child` columns absent from `kept`, in descending order so
/// rows can remove them without shifting.
pub(crate) fn removal_indexes(child: &DataStructure, kept: &DataStructure) -> Vec<usize> {
    let mut indexes: Vec<usize> = child
        .components()
        .iter()
        .enumerate()
        .filter(|(_, component)| !kept.contains(&component.name))
        .map(|(index, _)| index)
        .collect();
    indexes.reverse();
    indexes
}

/// Projects the listed positions away from every row of the stream.
pub(crate) fn project_away(stream: DataPointStream, indexes: Vec<usize>) -> DataPointStream {
    if indexes.is_empty() {
        return stream;
    }
    Box::new(stream.map(move |row| {
        row.map(|mut row| {
            row.remove_descending(&indexes);
            row
        })
    }))
}

/// Shared children are reference counted; a diamond-shaped DAG pulls the
/// same node from several parents without copying it.
pub type OperationRef = Rc<dyn DatasetOperation>;
