//! Lifts a plain `Dataset` into the operation DAG.
//!
//! The wrapper is the degradation point of the pushdown protocol: when the
//! underlying source declines a sorted/filtered stream, the wrapper sorts
//! and filters locally before handing rows onward, so every parent can rely
//! on `compute_rows` honoring its request.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use vtl_model::prelude::*;

use crate::config::EngineConfig;
use crate::operations::DatasetOperation;
use crate::stream::{filter_locally, sort_locally, verify_sorted, StreamTrace};

pub struct WrapperOperation {
    source: Rc<dyn Dataset>,
    structure: DataStructure,
    config: EngineConfig,
}

impl WrapperOperation {
    pub fn new(source: Rc<dyn Dataset>) -> Self {
        Self::with_config(source, EngineConfig::from_env())
    }

    pub fn with_config(source: Rc<dyn Dataset>, config: EngineConfig) -> Self {
        let structure = source.structure().clone();
        Self {
            source,
            structure,
            config,
        }
    }
}

impl Dataset for WrapperOperation {
    fn structure(&self) -> &DataStructure {
        &self.structure
    }

    fn rows(&self) -> DataPointStream {
        self.source.rows()
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
        self.source.size()
    }

    fn distinct_values_count(&self) -> Option<HashMap<String, u64>> {
        self.source.distinct_values_count()
    }
}

impl DatasetOperation for WrapperOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        filtering.clone()
    }

    fn required_ordering(&self, ordering: &Ordering) -> Option<Ordering> {
        Some(ordering.clone())
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &HashSet<String>,
    ) -> DataPointStream {
        match self.source.rows_where(ordering, filtering, columns) {
            Some(stream) => {
                StreamTrace {
                    operation: "wrapper",
                    requested_ordering: ordering,
                    requested_filtering: filtering,
                    child_ordering: Some(ordering),
                    child_filtering: filtering,
                    sorted_locally: false,
                    filtered_locally: false,
                }
                .log();
                if self.config.verify_sorted_inputs {
                    verify_sorted(stream, ordering, &self.structure)
                } else {
                    stream
                }
            }
            None => {
                StreamTrace {
                    operation: "wrapper",
                    requested_ordering: ordering,
                    requested_filtering: filtering,
                    child_ordering: None,
                    child_filtering: &Filtering::all(),
                    sorted_locally: true,
                    filtered_locally: true,
                }
                .log();
                let filtered = filter_locally(self.source.rows(), filtering, &self.structure);
                sort_locally(
                    filtered,
                    ordering,
                    &self.structure,
                    self.config.sort_buffer_hint,
                )
            }
        }
    }
}
