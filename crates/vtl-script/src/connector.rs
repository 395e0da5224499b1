//! Connectors: the boundary to external dataset providers.
//!
//! The engine treats connector failures as opaque; whatever error a
//! provider raises is boxed into `VtlError::Connector` and propagated
//! unchanged.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use vtl_model::prelude::*;

pub trait Connector {
    /// True when this connector can serve the named dataset, used to pick a
    /// connector when several are registered.
    fn can_handle(&self, name: &str) -> bool;

    fn get_dataset(&self, name: &str) -> Result<Rc<dyn Dataset>>;

    /// Publishes a dataset under a name. Providers that only serve data
    /// may leave the default, which rejects the write.
    fn put_dataset(&self, name: &str, _dataset: Rc<dyn Dataset>) -> Result<()> {
        Err(VtlError::Connector(Box::new(ReadOnlyConnector(
            name.to_string(),
        ))))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("connector cannot store dataset '{0}'")]
struct ReadOnlyConnector(String);

#[derive(Debug, thiserror::Error)]
#[error("unknown dataset '{0}'")]
struct UnknownDataset(String);

/// Connector over pre-registered in-memory datasets, used by tests and by
/// hosts that assemble their inputs programmatically.
#[derive(Default)]
pub struct InMemoryConnector {
    datasets: RefCell<HashMap<String, Rc<dyn Dataset>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, dataset: Rc<dyn Dataset>) {
        self.datasets.borrow_mut().insert(name.into(), dataset);
    }
}

impl Connector for InMemoryConnector {
    fn can_handle(&self, name: &str) -> bool {
        self.datasets.borrow().contains_key(name)
    }

    fn get_dataset(&self, name: &str) -> Result<Rc<dyn Dataset>> {
        self.datasets
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| VtlError::Connector(Box::new(UnknownDataset(name.to_string()))))
    }

    fn put_dataset(&self, name: &str, dataset: Rc<dyn Dataset>) -> Result<()> {
        self.register(name, dataset);
        Ok(())
    }
}
