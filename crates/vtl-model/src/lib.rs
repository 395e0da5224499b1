#![forbid(unsafe_code)]
//! vtl-model: the data model of the VTL engine.
//!
//! A dataset is a table whose columns carry roles and types:
//!
//! ```text
//!        +--------------------------------------+
//!        | Components                           |
//! +------+------------+------------+------------+
//! |Name  | country    | population | updated    |
//! |Type  | String     | Integer    | Date       |
//! |Role  | Identifier | Measure    | Attribute  |
//! +------+------------+------------+------------+
//! ```
//!
//! This crate holds the scalar value lattice, components and structures,
//! positional data points, the filtering and ordering specifications used
//! for pushdown, and the `Dataset` streaming contract. The operation DAG
//! and the join engine live in `vtl-script`.

pub mod component;
pub mod datapoint;
pub mod dataset;
pub mod error;
pub mod filtering;
pub mod ordering;
pub mod prelude;
pub mod structure;
pub mod value;

pub use error::{Result, VtlError};
