//! Convenient re-exports for downstream crates.

pub use crate::component::{Component, DataType, Role};
pub use crate::datapoint::DataPoint;
pub use crate::dataset::{DataPointStream, Dataset, InMemoryDataset};
pub use crate::error::{Result, VtlError};
pub use crate::filtering::{CompareOp, Filtering};
pub use crate::ordering::{Direction, Ordering};
pub use crate::structure::DataStructure;
pub use crate::value::VtlValue;
