//! Components: the typed, role-carrying columns of a data structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of scalar types a component can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        };
        f.write_str(name)
    }
}

/// Role of a component inside a data structure.
///
/// The declaration order is the default sort order of roles: identifiers
/// first, then measures, then attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Identifier,
    Measure,
    Attribute,
}

/// A named, typed column with a role. Identity is `(name, data_type, role)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub data_type: DataType,
    pub role: Role,
}

impl Component {
    pub fn new(name: impl Into<String>, data_type: DataType, role: Role) -> Self {
        Self {
            name: name.into(),
            data_type,
            role,
        }
    }

    pub fn identifier(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, Role::Identifier)
    }

    pub fn measure(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, Role::Measure)
    }

    pub fn attribute(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, Role::Attribute)
    }

    pub fn is_identifier(&self) -> bool {
        self.role == Role::Identifier
    }

    pub fn is_measure(&self) -> bool {
        self.role == Role::Measure
    }
}
