#![forbid(unsafe_code)]
//! vtl-script: the operation DAG and join engine of the VTL engine.
//!
//! A script is lowered into a DAG of `DatasetOperation` nodes over datasets
//! resolved through connectors. Each node derives its schema at
//! construction, pushes its parent's ordering and filtering requirements
//! down to its children, and streams rows lazily. The sort-merge join folds
//! N key-ordered child streams into joined rows without materializing
//! intermediate tables.

pub mod builder;
pub mod config;
pub mod connector;
pub mod functions;
pub mod operations;
pub mod stream;

pub use builder::{OperationBuilder, OperationDescriptor};
pub use config::EngineConfig;
pub use connector::{Connector, InMemoryConnector};
pub use operations::{DatasetOperation, JoinType, OperationRef};
