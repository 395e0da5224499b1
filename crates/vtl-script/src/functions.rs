//! Scalar functions and accumulators applied by the calc and aggregation
//! operations.

use vtl_model::component::DataType;
use vtl_model::prelude::*;

/// A pure function over one scalar value.
///
/// Null propagates: every function returns null for a null input without
/// touching its domain checks.
pub trait ScalarFunction {
    fn name(&self) -> &'static str;

    /// Output type for a given input type, or a type error when the
    /// function does not accept it. Checked once at plan time.
    fn output_type(&self, input: DataType) -> Result<DataType>;

    fn apply(&self, value: &VtlValue) -> Result<VtlValue>;
}

impl std::fmt::Debug for dyn ScalarFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ScalarFunction").field(&self.name()).finish()
    }
}

/// Natural logarithm over numeric values.
pub struct NaturalLog;

impl ScalarFunction for NaturalLog {
    fn name(&self) -> &'static str {
        "ln"
    }

    fn output_type(&self, input: DataType) -> Result<DataType> {
        match input {
            DataType::Integer | DataType::Float => Ok(DataType::Float),
            other => Err(VtlError::UnsupportedType(format!(
                "ln is undefined for {other}"
            ))),
        }
    }

    fn apply(&self, value: &VtlValue) -> Result<VtlValue> {
        let operand = match value {
            VtlValue::Null => return Ok(VtlValue::Null),
            VtlValue::Integer(i) => *i as f64,
            VtlValue::Float(f) => *f,
            other => {
                return Err(VtlError::UnsupportedType(format!(
                    "ln is undefined for {other}"
                )))
            }
        };
        if operand <= 0.0 {
            return Err(VtlError::Domain(format!(
                "ln is undefined for non-positive value {operand}"
            )));
        }
        Ok(VtlValue::Float(operand.ln()))
    }
}

/// Folds the values of one column within a group. Null inputs are skipped;
/// a group of only nulls yields null.
pub trait Accumulator {
    fn update(&mut self, value: &VtlValue) -> Result<()>;
    fn finish(&mut self) -> VtlValue;
}

/// Which accumulator an aggregation applies. Carried by descriptors, hence
/// serializable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Sum,
    Product,
}

impl AggregateKind {
    pub fn accumulator(self) -> Box<dyn Accumulator> {
        match self {
            AggregateKind::Sum => Box::new(Fold::sum()),
            AggregateKind::Product => Box::new(Fold::product()),
        }
    }

    /// Result type of the fold for a given input type.
    pub fn output_type(self, input: DataType) -> Result<DataType> {
        match input {
            DataType::Integer | DataType::Float => Ok(input),
            other => Err(VtlError::UnsupportedType(format!(
                "cannot aggregate values of type {other}"
            ))),
        }
    }
}

/// Sum and product share the folding skeleton; only the combining step
/// differs.
struct Fold {
    state: Option<VtlValue>,
    combine: fn(&VtlValue, &VtlValue) -> Result<VtlValue>,
}

impl Fold {
    fn sum() -> Self {
        Self {
            state: None,
            combine: add,
        }
    }

    fn product() -> Self {
        Self {
            state: None,
            combine: multiply,
        }
    }
}

impl Accumulator for Fold {
    fn update(&mut self, value: &VtlValue) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        self.state = Some(match &self.state {
            None => value.clone(),
            Some(state) => (self.combine)(state, value)?,
        });
        Ok(())
    }

    fn finish(&mut self) -> VtlValue {
        self.state.take().unwrap_or(VtlValue::Null)
    }
}

fn add(a: &VtlValue, b: &VtlValue) -> Result<VtlValue> {
    numeric_op(a, b, |x, y| x + y, |x, y| x.checked_add(y))
}

fn multiply(a: &VtlValue, b: &VtlValue) -> Result<VtlValue> {
    numeric_op(a, b, |x, y| x * y, |x, y| x.checked_mul(y))
}

fn numeric_op(
    a: &VtlValue,
    b: &VtlValue,
    float_op: fn(f64, f64) -> f64,
    int_op: fn(i64, i64) -> Option<i64>,
) -> Result<VtlValue> {
    match (a, b) {
        (VtlValue::Integer(x), VtlValue::Integer(y)) => int_op(*x, *y)
            .map(VtlValue::Integer)
            .ok_or_else(|| VtlError::Domain("integer overflow in aggregation".to_string())),
        (VtlValue::Integer(x), VtlValue::Float(y)) => Ok(VtlValue::Float(float_op(*x as f64, *y))),
        (VtlValue::Float(x), VtlValue::Integer(y)) => Ok(VtlValue::Float(float_op(*x, *y as f64))),
        (VtlValue::Float(x), VtlValue::Float(y)) => Ok(VtlValue::Float(float_op(*x, *y))),
        // update() skips nulls, so both payload types exist here.
        (a, b) => Err(VtlError::TypeMismatch {
            left: a.data_type().unwrap_or(DataType::String),
            right: b.data_type().unwrap_or(DataType::String),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_of_positive_values() {
        let result = NaturalLog.apply(&VtlValue::Float(std::f64::consts::E)).unwrap();
        match result {
            VtlValue::Float(f) => assert!((f - 1.0).abs() < 1e-12),
            other => panic!("unexpected value {other}"),
        }
        assert_eq!(
            NaturalLog.apply(&VtlValue::Integer(1)).unwrap(),
            VtlValue::Float(0.0)
        );
    }

    #[test]
    fn ln_propagates_null() {
        assert_eq!(NaturalLog.apply(&VtlValue::Null).unwrap(), VtlValue::Null);
    }

    #[test]
    fn ln_rejects_non_positive_values() {
        assert!(matches!(
            NaturalLog.apply(&VtlValue::Integer(0)),
            Err(VtlError::Domain(_))
        ));
        assert!(matches!(
            NaturalLog.apply(&VtlValue::Float(-1.5)),
            Err(VtlError::Domain(_))
        ));
    }

    #[test]
    fn ln_rejects_non_numeric_types() {
        assert!(matches!(
            NaturalLog.apply(&VtlValue::Str("x".into())),
            Err(VtlError::UnsupportedType(_))
        ));
        assert!(matches!(
            NaturalLog.output_type(DataType::Boolean),
            Err(VtlError::UnsupportedType(_))
        ));
    }

    #[test]
    fn sum_skips_nulls() {
        let mut sum = AggregateKind::Sum.accumulator();
        for value in [VtlValue::Integer(1), VtlValue::Null, VtlValue::Integer(2)] {
            sum.update(&value).unwrap();
        }
        assert_eq!(sum.finish(), VtlValue::Integer(3));
    }

    #[test]
    fn product_mixes_integers_and_floats() {
        let mut product = AggregateKind::Product.accumulator();
        product.update(&VtlValue::Integer(4)).unwrap();
        product.update(&VtlValue::Float(0.5)).unwrap();
        assert_eq!(product.finish(), VtlValue::Float(2.0));
    }

    #[test]
    fn all_null_group_yields_null() {
        let mut sum = AggregateKind::Sum.accumulator();
        sum.update(&VtlValue::Null).unwrap();
        assert_eq!(sum.finish(), VtlValue::Null);
    }
}
