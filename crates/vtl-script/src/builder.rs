//! Descriptor-driven construction of the operation DAG.
//!
//! A front end hands over a tree of operation descriptors; `build` resolves
//! source names through the connectors and assembles the corresponding
//! `DatasetOperation` nodes bottom-up.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use vtl_model::prelude::*;

use crate::connector::Connector;
use crate::functions::{AggregateKind, NaturalLog, ScalarFunction};
use crate::operations::{
    AggregationOperation, CalcOperation, DropOperation, FilterOperation, JoinOperation, JoinType,
    KeepOperation, OperationRef, RenameOperation, WrapperOperation,
};

/// Serializable description of one node of the operation DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationDescriptor {
    Source {
        name: String,
    },
    Keep {
        components: Vec<String>,
        input: Box<OperationDescriptor>,
    },
    Drop {
        components: Vec<String>,
        input: Box<OperationDescriptor>,
    },
    Rename {
        mapping: HashMap<String, String>,
        input: Box<OperationDescriptor>,
    },
    Filter {
        predicate: Filtering,
        input: Box<OperationDescriptor>,
    },
    Calc {
        /// Name of a built-in scalar function, e.g. `"ln"`.
        function: String,
        input_component: String,
        output_component: String,
        input: Box<OperationDescriptor>,
    },
    Aggregate {
        group_by: Vec<String>,
        input_component: String,
        output_component: String,
        kind: AggregateKind,
        input: Box<OperationDescriptor>,
    },
    Join {
        join_type: JoinType,
        inputs: Vec<OperationDescriptor>,
    },
}

pub struct OperationBuilder<'a> {
    connectors: Vec<&'a dyn Connector>,
}

impl<'a> OperationBuilder<'a> {
    pub fn new(connectors: Vec<&'a dyn Connector>) -> Self {
        Self { connectors }
    }

    pub fn build(&self, descriptor: &OperationDescriptor) -> Result<OperationRef> {
        match descriptor {
            OperationDescriptor::Source { name } => {
                let source = self.resolve(name)?;
                Ok(Rc::new(WrapperOperation::new(source)))
            }
            OperationDescriptor::Keep { components, input } => {
                let child = self.build(input)?;
                Ok(Rc::new(KeepOperation::new(
                    child,
                    components.iter().cloned().collect(),
                )?))
            }
            OperationDescriptor::Drop { components, input } => {
                let child = self.build(input)?;
                Ok(Rc::new(DropOperation::new(
                    child,
                    components.iter().cloned().collect(),
                )?))
            }
            OperationDescriptor::Rename { mapping, input } => {
                let child = self.build(input)?;
                Ok(Rc::new(RenameOperation::new(child, mapping.clone())?))
            }
            OperationDescriptor::Filter { predicate, input } => {
                let child = self.build(input)?;
                Ok(Rc::new(FilterOperation::new(child, predicate.clone())?))
            }
            OperationDescriptor::Calc {
                function,
                input_component,
                output_component,
                input,
            } => {
                let child = self.build(input)?;
                let function = scalar_function(function)?;
                Ok(Rc::new(CalcOperation::new(
                    child,
                    function,
                    input_component,
                    output_component.clone(),
                )?))
            }
            OperationDescriptor::Aggregate {
                group_by,
                input_component,
                output_component,
                kind,
                input,
            } => {
                let child = self.build(input)?;
                Ok(Rc::new(AggregationOperation::new(
                    child,
                    group_by.clone(),
                    input_component,
                    output_component.clone(),
                    *kind,
                )?))
            }
            OperationDescriptor::Join { join_type, inputs } => {
                let children = inputs
                    .iter()
                    .map(|input| self.build(input))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Rc::new(JoinOperation::new(children, *join_type)?))
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<Rc<dyn Dataset>> {
        for connector in &self.connectors {
            if connector.can_handle(name) {
                return connector.get_dataset(name);
            }
        }
        Err(VtlError::Schema(format!(
            "no connector can serve dataset '{name}'"
        )))
    }
}

fn scalar_function(name: &str) -> Result<Rc<dyn ScalarFunction>> {
    match name {
        "ln" => Ok(Rc::new(NaturalLog)),
        other => Err(VtlError::Schema(format!(
            "unknown scalar function '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::InMemoryConnector;
    use vtl_model::component::{Component, DataType};

    fn connector() -> InMemoryConnector {
        let connector = InMemoryConnector::new();
        let structure = DataStructure::builder()
            .add(Component::identifier("id", DataType::Integer))
            .add(Component::measure("amount", DataType::Integer))
            .add(Component::attribute("note", DataType::String))
            .build()
            .unwrap();
        let rows = vec![
            DataPoint::new(vec![
                VtlValue::Integer(1),
                VtlValue::Integer(10),
                VtlValue::Str("a".into()),
            ]),
            DataPoint::new(vec![
                VtlValue::Integer(2),
                VtlValue::Integer(20),
                VtlValue::Str("b".into()),
            ]),
        ];
        connector.register(
            "ds1",
            Rc::new(InMemoryDataset::new(structure, rows).unwrap()),
        );
        connector
    }

    fn source(name: &str) -> Box<OperationDescriptor> {
        Box::new(OperationDescriptor::Source {
            name: name.to_string(),
        })
    }

    #[test]
    fn builds_a_nested_descriptor_tree() {
        let connector = connector();
        let builder = OperationBuilder::new(vec![&connector]);
        let descriptor = OperationDescriptor::Keep {
            components: vec!["amount".to_string()],
            input: Box::new(OperationDescriptor::Filter {
                predicate: Filtering::gt("amount", 10),
                input: source("ds1"),
            }),
        };

        let operation = builder.build(&descriptor).unwrap();
        let names: Vec<_> = operation.structure().names().collect();
        assert_eq!(names, ["id", "amount"]);
        let rows: Vec<DataPoint> = operation.rows().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), &VtlValue::Integer(2));
    }

    #[test]
    fn resolves_built_in_scalar_functions() {
        let connector = connector();
        let builder = OperationBuilder::new(vec![&connector]);
        let descriptor = OperationDescriptor::Calc {
            function: "ln".to_string(),
            input_component: "amount".to_string(),
            output_component: "ln_amount".to_string(),
            input: source("ds1"),
        };
        let operation = builder.build(&descriptor).unwrap();
        assert!(operation.structure().contains("ln_amount"));

        let unknown = OperationDescriptor::Calc {
            function: "nope".to_string(),
            input_component: "amount".to_string(),
            output_component: "x".to_string(),
            input: source("ds1"),
        };
        assert!(matches!(
            builder.build(&unknown).unwrap_err(),
            VtlError::Schema(_)
        ));
    }

    #[test]
    fn unknown_sources_fail_to_build() {
        let connector = connector();
        let builder = OperationBuilder::new(vec![&connector]);
        let err = builder.build(&source("missing")).unwrap_err();
        assert!(matches!(err, VtlError::Schema(_)));
    }

    #[test]
    fn descriptors_round_trip_through_json() {
        let descriptor = OperationDescriptor::Join {
            join_type: JoinType::Outer,
            inputs: vec![
                OperationDescriptor::Source {
                    name: "left".to_string(),
                },
                OperationDescriptor::Rename {
                    mapping: [("amount".to_string(), "total".to_string())].into(),
                    input: source("right"),
                },
            ],
        };
        let json = serde_json::to_string(&descriptor).unwrap();
        let parsed: OperationDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, descriptor);
    }
}
