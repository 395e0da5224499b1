//! Data structures: the ordered column layout every data point aligns to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::component::{Component, Role};
use crate::error::{Result, VtlError};

/// Ordered, name-unique set of components. Iteration order is the canonical
/// column order; built once per operation and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStructure {
    components: Vec<Component>,
}

impl DataStructure {
    pub fn builder() -> DataStructureBuilder {
        DataStructureBuilder {
            components: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Position of a component by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name == name)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name.as_str())
    }

    pub fn name_set(&self) -> HashSet<String> {
        self.names().map(str::to_string).collect()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Component> {
        self.with_role(Role::Identifier)
    }

    pub fn measures(&self) -> impl Iterator<Item = &Component> {
        self.with_role(Role::Measure)
    }

    fn with_role(&self, role: Role) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.role == role)
    }
}

pub struct DataStructureBuilder {
    components: Vec<Component>,
}

impl DataStructureBuilder {
    pub fn add(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn add_all(mut self, components: impl IntoIterator<Item = Component>) -> Self {
        self.components.extend(components);
        self
    }

    pub fn build(self) -> Result<DataStructure> {
        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.name.as_str()) {
                return Err(VtlError::Schema(format!(
                    "duplicate component name '{}'",
                    component.name
                )));
            }
        }
        Ok(DataStructure {
            components: self.components,
        })
    }
}
