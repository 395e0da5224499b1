//! Stream adapters shared by the operations: local sort and filter
//! fallbacks, contract verification, and pushdown diagnostics.

use std::cmp::Ordering as Cmp;

use vtl_model::prelude::*;

/// Materializes and sorts a stream. An error element short-circuits into a
/// single-element error stream.
pub fn sort_locally(
    stream: DataPointStream,
    ordering: &Ordering,
    structure: &DataStructure,
    capacity_hint: Option<usize>,
) -> DataPointStream {
    let mut rows = Vec::with_capacity(capacity_hint.unwrap_or(0));
    for row in stream {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => return Box::new(std::iter::once(Err(e))),
        }
    }
    let ordering = ordering.clone();
    let structure = structure.clone();
    rows.sort_by(|a, b| ordering.compare(a, b, &structure));
    Box::new(rows.into_iter().map(Ok))
}

/// Lazily drops rows rejected by the filter. Errors pass through.
pub fn filter_locally(
    stream: DataPointStream,
    filtering: &Filtering,
    structure: &DataStructure,
) -> DataPointStream {
    let filtering = filtering.clone();
    let structure = structure.clone();
    Box::new(stream.filter(move |row| match row {
        Ok(row) => filtering.test(row, &structure),
        Err(_) => true,
    }))
}

/// Re-checks the sort contract of a stream served by an external source.
/// A violating pair terminates the stream with a precondition error.
pub fn verify_sorted(
    stream: DataPointStream,
    ordering: &Ordering,
    structure: &DataStructure,
) -> DataPointStream {
    struct VerifySorted {
        inner: DataPointStream,
        ordering: Ordering,
        structure: DataStructure,
        previous: Option<DataPoint>,
        done: bool,
    }

    impl Iterator for VerifySorted {
        type Item = Result<DataPoint>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.done {
                return None;
            }
            match self.inner.next()? {
                Ok(row) => {
                    if let Some(previous) = &self.previous {
                        if self.ordering.compare(previous, &row, &self.structure) == Cmp::Greater
                        {
                            self.done = true;
                            return Some(Err(VtlError::Precondition(format!(
                                "source stream violates the requested ordering ({})",
                                self.ordering
                            ))));
                        }
                    }
                    self.previous = Some(row.clone());
                    Some(Ok(row))
                }
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            }
        }
    }

    Box::new(VerifySorted {
        inner: stream,
        ordering: ordering.clone(),
        structure: structure.clone(),
        previous: None,
        done: false,
    })
}

/// Diagnostic record of one `compute_rows` call: what the parent requested,
/// what was delegated to the child, and what had to be done locally.
pub struct StreamTrace<'a> {
    pub operation: &'static str,
    pub requested_ordering: &'a Ordering,
    pub requested_filtering: &'a Filtering,
    pub child_ordering: Option<&'a Ordering>,
    pub child_filtering: &'a Filtering,
    pub sorted_locally: bool,
    pub filtered_locally: bool,
}

impl StreamTrace<'_> {
    pub fn log(&self) {
        tracing::debug!(
            operation = self.operation,
            requested_ordering = %self.requested_ordering,
            requested_filtering = %self.requested_filtering,
            child_ordering = self
                .child_ordering
                .map(|o| o.to_string())
                .unwrap_or_else(|| "unordered".to_string()),
            child_filtering = %self.child_filtering,
            sorted_locally = self.sorted_locally,
            filtered_locally = self.filtered_locally,
            "computed row stream"
        );
    }
}
