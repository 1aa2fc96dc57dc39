use crate::runtime::error::{EvalError, EvalResult};
use std::fmt;
use std::rc::Rc;

pub type NativeFn = fn(&[Value]) -> EvalResult<Value>;

/// Evaluation results are either scalars or row-vectorized columns.
/// Functions are ordinary values so they live in enclosing scopes and
/// resolve through the same lookup as any other binding.
#[derive(Clone, Debug)]
pub enum Value {
    Unit,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Column(ColumnValue),
    Function(FunctionValue),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Column(_) => "column",
            Value::Function(_) => "function",
        }
    }

    pub fn as_f64(&self) -> EvalResult<f64> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            other => Err(EvalError::TypeMismatch {
                message: format!("expected a number, found {}", other.type_name()),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Column(a), Value::Column(b)) => a.values == b.values,
            (Value::Function(a), Value::Function(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Column(column) => {
                write!(f, "[")?;
                for (idx, value) in column.values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name),
        }
    }
}

/// A row-vectorized column of values. The declared name is carried when the
/// column came straight out of a data scope; derived columns have none.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnValue {
    pub name: Option<String>,
    pub values: Rc<Vec<Value>>,
}

impl ColumnValue {
    pub fn new(name: Option<String>, values: Vec<Value>) -> Self {
        Self {
            name,
            values: Rc::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone)]
pub struct FunctionValue {
    pub name: String,
    pub f: NativeFn,
}

impl FunctionValue {
    pub fn new(name: impl Into<String>, f: NativeFn) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .finish()
    }
}

/// Applies a scalar operation across two operands, promoting to a column
/// only when at least one operand is a column (row broadcast). Two columns
/// are zipped and must have equal length.
pub fn broadcast2<F>(lhs: &Value, rhs: &Value, op: F) -> EvalResult<Value>
where
    F: Fn(&Value, &Value) -> EvalResult<Value>,
{
    match (lhs, rhs) {
        (Value::Column(a), Value::Column(b)) => {
            if a.len() != b.len() {
                return Err(EvalError::TypeMismatch {
                    message: format!("column lengths {} and {} differ", a.len(), b.len()),
                });
            }
            let values = a
                .values
                .iter()
                .zip(b.values.iter())
                .map(|(x, y)| op(x, y))
                .collect::<EvalResult<Vec<Value>>>()?;
            Ok(Value::Column(ColumnValue::new(None, values)))
        }
        (Value::Column(a), scalar) => {
            let values = a
                .values
                .iter()
                .map(|x| op(x, scalar))
                .collect::<EvalResult<Vec<Value>>>()?;
            Ok(Value::Column(ColumnValue::new(None, values)))
        }
        (scalar, Value::Column(b)) => {
            let values = b
                .values
                .iter()
                .map(|y| op(scalar, y))
                .collect::<EvalResult<Vec<Value>>>()?;
            Ok(Value::Column(ColumnValue::new(None, values)))
        }
        (a, b) => op(a, b),
    }
}
