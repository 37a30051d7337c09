//! Identity and structural comparison of [Value]s.
//!
//! Structural comparison is the one used by every "called with" and "equals" assertion.
//! Identity comparison compares compound values by reference.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::entities::Value;

/// [EqualityEngine] related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// A value refers back to itself
    #[error("Cyclic value detected at '{path}', cyclic structures can not be compared")]
    Cycle {
        /// Location of the cycle
        path: String,
    },

    /// The values are nested deeper than the configured bound
    #[error("Comparison exceeded the maximum depth of {max_depth} at '{path}'")]
    DepthExceeded {
        /// Configured bound
        max_depth: usize,
        /// Location where the bound was hit
        path: String,
    },
}

/// First location where two values structurally differ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Location of the difference, `$` being the root
    pub path: String,

    /// Rendering of the expected side at that location
    pub expected: String,

    /// Rendering of the actual side at that location
    pub actual: String,
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "at {}: expected {}, received {}",
            self.path, self.expected, self.actual
        )
    }
}

/// Compare values by identity or by structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualityEngine {
    max_depth: usize,
}

impl EqualityEngine {
    /// Default nesting bound of structural comparisons
    pub const DEFAULT_MAX_DEPTH: usize = 128;

    /// Create an engine with the given nesting bound
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Nesting bound of structural comparisons
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Identity equality.
    ///
    /// Scalars are equal when they have the same type and value (`NaN` is the same as `NaN`,
    /// `0.0` is not the same as `-0.0`). Compound values are the same only when both are empty
    /// or when both are the same reference.
    pub fn same_as(left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Absent, Value::Absent) | (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Float(l), Value::Float(r)) => same_float(*l, *r),
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::List(l), Value::List(r)) => {
                std::sync::Arc::ptr_eq(l, r) || (l.is_empty() && r.is_empty())
            }
            (Value::Map(l), Value::Map(r)) => {
                std::sync::Arc::ptr_eq(l, r) || (l.is_empty() && r.is_empty())
            }
            (Value::Cell(l), Value::Cell(r)) => l.ptr_eq(r),
            (Value::Future(l), Value::Future(r)) => l.ptr_eq(r),
            _ => false,
        }
    }

    /// Structural equality.
    ///
    /// Fails if a cycle is found or if the nesting bound is exceeded, it never reports such
    /// values as unequal.
    pub fn equal_to(&self, left: &Value, right: &Value) -> Result<bool, ComparisonError> {
        Ok(self.explain(left, right)?.is_none())
    }

    /// Structural equality of two argument lists
    pub fn all_equal_to(&self, left: &[Value], right: &[Value]) -> Result<bool, ComparisonError> {
        Ok(self.explain_all(left, right)?.is_none())
    }

    /// First structural difference between an expected and an actual value
    pub fn explain(
        &self,
        expected: &Value,
        actual: &Value,
    ) -> Result<Option<Mismatch>, ComparisonError> {
        Traversal::new(self.max_depth).compare(expected, actual)
    }

    /// First structural difference between an expected and an actual argument list
    pub fn explain_all(
        &self,
        expected: &[Value],
        actual: &[Value],
    ) -> Result<Option<Mismatch>, ComparisonError> {
        Traversal::new(self.max_depth).compare_lists(expected, actual)
    }
}

impl Default for EqualityEngine {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

fn same_float(left: f64, right: f64) -> bool {
    (left.is_nan() && right.is_nan()) || left.to_bits() == right.to_bits()
}

/// Exact comparison, the integer is never rounded to the nearest float.
fn int_equals_float(int: i64, float: f64) -> bool {
    const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

    float.fract() == 0.0
        && (-I64_UPPER_BOUND..I64_UPPER_BOUND).contains(&float)
        && float as i64 == int
        && same_float(int as f64, float)
}

struct Traversal {
    max_depth: usize,
    path: Vec<String>,
    expected_cells: Vec<usize>,
    actual_cells: Vec<usize>,
}

impl Traversal {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            path: vec![],
            expected_cells: vec![],
            actual_cells: vec![],
        }
    }

    fn location(&self) -> String {
        format!("${}", self.path.concat())
    }

    fn mismatch(&self, expected: impl Display, actual: impl Display) -> Option<Mismatch> {
        Some(Mismatch {
            path: self.location(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }

    fn descend(&mut self, segment: String) -> Result<(), ComparisonError> {
        self.path.push(segment);
        if self.path.len() > self.max_depth {
            return Err(ComparisonError::DepthExceeded {
                max_depth: self.max_depth,
                path: self.location(),
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.path.pop();
    }

    fn compare(
        &mut self,
        expected: &Value,
        actual: &Value,
    ) -> Result<Option<Mismatch>, ComparisonError> {
        if EqualityEngine::same_as(expected, actual) {
            return Ok(None);
        }

        match (expected, actual) {
            (Value::Cell(_), _) | (_, Value::Cell(_)) => self.compare_cells(expected, actual),
            (Value::Int(e), Value::Int(a)) if e != a => Ok(self.mismatch(expected, actual)),
            (Value::Float(e), Value::Float(a)) if !same_float(*e, *a) => {
                Ok(self.mismatch(expected, actual))
            }
            (Value::Int(int), Value::Float(float)) | (Value::Float(float), Value::Int(int)) => {
                if int_equals_float(*int, *float) {
                    Ok(None)
                } else {
                    Ok(self.mismatch(expected, actual))
                }
            }
            (Value::List(e), Value::List(a)) => self.compare_lists(e, a),
            (Value::Map(e), Value::Map(a)) => {
                if e.len() != a.len() || e.keys().ne(a.keys()) {
                    let expected_keys: Vec<&String> = e.keys().collect();
                    let actual_keys: Vec<&String> = a.keys().collect();
                    return Ok(self.mismatch(
                        format!("keys {expected_keys:?}"),
                        format!("keys {actual_keys:?}"),
                    ));
                }
                for (key, expected_item) in e.iter() {
                    self.descend(format!(".{key}"))?;
                    let result = self.compare(expected_item, &a[key])?;
                    self.ascend();
                    if result.is_some() {
                        return Ok(result);
                    }
                }
                Ok(None)
            }
            _ => Ok(self.mismatch(expected, actual)),
        }
    }

    fn compare_lists(
        &mut self,
        expected: &[Value],
        actual: &[Value],
    ) -> Result<Option<Mismatch>, ComparisonError> {
        if expected.len() != actual.len() {
            return Ok(self.mismatch(
                format!("{} element(s)", expected.len()),
                format!("{} element(s)", actual.len()),
            ));
        }
        for (index, (expected_item, actual_item)) in expected.iter().zip(actual).enumerate() {
            self.descend(format!("[{index}]"))?;
            let result = self.compare(expected_item, actual_item)?;
            self.ascend();
            if result.is_some() {
                return Ok(result);
            }
        }
        Ok(None)
    }

    fn compare_cells(
        &mut self,
        expected: &Value,
        actual: &Value,
    ) -> Result<Option<Mismatch>, ComparisonError> {
        let expected_entered = self.enter_cell(expected, Side::Expected)?;
        let actual_entered = self.enter_cell(actual, Side::Actual)?;

        self.descend("*".to_string())?;
        let result = self.compare(&expected_entered.value, &actual_entered.value);
        self.ascend();

        if expected_entered.pushed {
            self.expected_cells.pop();
        }
        if actual_entered.pushed {
            self.actual_cells.pop();
        }
        result
    }

    fn enter_cell(&mut self, value: &Value, side: Side) -> Result<EnteredCell, ComparisonError> {
        let Value::Cell(cell) = value else {
            return Ok(EnteredCell {
                value: value.clone(),
                pushed: false,
            });
        };
        let stack = match side {
            Side::Expected => &mut self.expected_cells,
            Side::Actual => &mut self.actual_cells,
        };
        if stack.contains(&cell.address()) {
            return Err(ComparisonError::Cycle {
                path: format!("${}", self.path.concat()),
            });
        }
        stack.push(cell.address());

        Ok(EnteredCell {
            value: cell.get(),
            pushed: true,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Expected,
    Actual,
}

struct EnteredCell {
    value: Value,
    pushed: bool,
}
