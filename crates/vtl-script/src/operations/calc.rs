//! Calc operation: appends a measure computed by a scalar function over one
//! input column.
//!
//! The computed column does not exist in the child, so parent filters are
//! relaxed by transposition before pushdown and re-tested here, and an
//! ordering that touches the computed column is sorted locally.

use std::collections::HashSet;
use std::rc::Rc;

use vtl_model::component::Component;
use vtl_model::prelude::*;

use crate::functions::ScalarFunction;
use crate::operations::{default_rows, DatasetOperation, OperationRef};
use crate::stream::{filter_locally, sort_locally, StreamTrace};

#[derive(Debug)]
pub struct CalcOperation {
    child: OperationRef,
    structure: DataStructure,
    function: Rc<dyn ScalarFunction>,
    input_index: usize,
}

impl CalcOperation {
    pub fn new(
        child: OperationRef,
        function: Rc<dyn ScalarFunction>,
        input: &str,
        output: impl Into<String>,
    ) -> Result<Self> {
        let input_index = child.structure().index_of(input).ok_or_else(|| {
            VtlError::Schema(format!("calc references unknown component '{input}'"))
        })?;
        // Type check once here so row errors can only be domain errors.
        let input_type = child.structure().components()[input_index].data_type;
        let output_type = function.output_type(input_type)?;
        let structure = DataStructure::builder()
            .add_all(child.structure().components().iter().cloned())
            .add(Component::measure(output, output_type))
            .build()?;
        Ok(Self {
            child,
            structure,
            function,
            input_index,
        })
    }

    fn output_name(&self) -> &str {
        // The computed column is always last.
        &self.structure.components()[self.structure.len() - 1].name
    }
}

impl Dataset for CalcOperation {
    fn structure(&self) -> &DataStructure {
        &self.structure
    }

    fn rows(&self) -> DataPointStream {
        default_rows(self)
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
        self.child.size()
    }
}

impl DatasetOperation for CalcOperation {
    fn required_filtering(&self, filtering: &Filtering) -> Filtering {
        filtering.transpose(&self.child.structure().name_set())
    }

    fn required_ordering(&self, ordering: &Ordering) -> Option<Ordering> {
        let output = self.output_name().to_string();
        ordering.map_columns(&|name| (name != output).then(|| name.to_string()))
    }

    fn compute_rows(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &HashSet<String>,
    ) -> DataPointStream {
        let child_filtering = self.required_filtering(filtering);
        let child_ordering = self.required_ordering(ordering);
        let filtered_locally = child_filtering != *filtering;
        let sorted_locally = child_ordering.is_none();
        StreamTrace {
            operation: "calc",
            requested_ordering: ordering,
            requested_filtering: filtering,
            child_ordering: child_ordering.as_ref(),
            child_filtering: &child_filtering,
            sorted_locally,
            filtered_locally,
        }
        .log();

        let stream = self.child.compute_rows(
            child_ordering.as_ref().unwrap_or(&Ordering::empty()),
            &child_filtering,
            &self.child.structure().name_set(),
        );

        let function = Rc::clone(&self.function);
        let input_index = self.input_index;
        let mut computed: DataPointStream = Box::new(Fuse {
            inner: Box::new(stream.map(move |row| {
                let mut row = row?;
                let value = function.apply(row.get(input_index))?;
                row.push(value);
                Ok(row)
            })),
            done: false,
        });

        if filtered_locally {
            computed = filter_locally(computed, filtering, &self.structure);
        }
        if sorted_locally {
            computed = sort_locally(computed, ordering, &self.structure, None);
        }
        computed
    }
}

/// Stops after the first error so a failed function application terminates
/// the stream.
struct Fuse {
    inner: DataPointStream,
    done: bool,
}

impl Iterator for Fuse {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.inner.next()?;
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::NaturalLog;
    use crate::operations::WrapperOperation;
    use vtl_model::component::DataType;

    fn child(amounts: &[i64]) -> OperationRef {
        let structure = DataStructure::builder()
            .add(Component::identifier("id", DataType::Integer))
            .add(Component::measure("amount", DataType::Integer))
            .build()
            .unwrap();
        let rows = amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| {
                DataPoint::new(vec![VtlValue::Integer(i as i64), VtlValue::Integer(amount)])
            })
            .collect();
        Rc::new(WrapperOperation::new(Rc::new(
            InMemoryDataset::new(structure, rows).unwrap(),
        )))
    }

    fn ln_of_amount(amounts: &[i64]) -> CalcOperation {
        CalcOperation::new(child(amounts), Rc::new(NaturalLog), "amount", "ln_amount").unwrap()
    }

    #[test]
    fn appends_the_computed_measure() {
        let calc = ln_of_amount(&[1]);
        let names: Vec<_> = calc.structure().names().collect();
        assert_eq!(names, ["id", "amount", "ln_amount"]);

        let rows: Vec<DataPoint> = calc.rows().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].get(2), &VtlValue::Float(0.0));
    }

    #[test]
    fn domain_error_terminates_the_stream() {
        let calc = ln_of_amount(&[1, -1, 10]);
        let mut stream = calc.compute_rows(
            &Ordering::ascending(["id"]),
            &Filtering::all(),
            &calc.structure().name_set(),
        );
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next().unwrap().unwrap_err(),
            VtlError::Domain(_)
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn filter_over_the_computed_column_is_applied_locally() {
        let calc = ln_of_amount(&[1, 10]);
        let stream = calc.compute_rows(
            &Ordering::ascending(["id"]),
            &Filtering::gt("ln_amount", 1.0),
            &calc.structure().name_set(),
        );
        let rows: Vec<DataPoint> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(1), &VtlValue::Integer(10));
    }

    #[test]
    fn ordering_over_the_computed_column_sorts_locally() {
        let calc = ln_of_amount(&[10, 1, 5]);
        let stream = calc.compute_rows(
            &Ordering::ascending(["ln_amount"]),
            &Filtering::all(),
            &calc.structure().name_set(),
        );
        let amounts: Vec<i64> = stream
            .map(|r| match r.unwrap().get(1) {
                VtlValue::Integer(i) => *i,
                other => panic!("unexpected value {other}"),
            })
            .collect();
        assert_eq!(amounts, [1, 5, 10]);
    }

    #[test]
    fn type_errors_are_caught_at_plan_time() {
        let structure = DataStructure::builder()
            .add(Component::identifier("id", DataType::String))
            .build()
            .unwrap();
        let child: OperationRef = Rc::new(WrapperOperation::new(Rc::new(
            InMemoryDataset::new(structure, vec![]).unwrap(),
        )));
        let err = CalcOperation::new(child, Rc::new(NaturalLog), "id", "ln_id").unwrap_err();
        assert!(matches!(err, VtlError::UnsupportedType(_)));
    }
}
