#![forbid(unsafe_code)]
//! Streaming VTL dataset-transformation engine.
//!
//! Facade over the workspace crates: `model` holds the value and dataset
//! contracts, `script` the operation DAG, connectors and the join engine.

pub use vtl_model as model;
pub use vtl_script as script;

pub use vtl_model::prelude;
