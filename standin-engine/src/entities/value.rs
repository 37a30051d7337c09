use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

use crate::entities::FutureValue;

/// A dynamically typed value exchanged with doubles and module members.
///
/// Compound values are shared: cloning a [Value::List] or a [Value::Map] clones a reference,
/// which is what identity comparison relies on.
#[derive(Clone, Default)]
pub enum Value {
    /// The explicit absent result, produced by a double without any behavior
    #[default]
    Absent,

    /// Null
    Null,

    /// Boolean
    Bool(bool),

    /// Signed integer
    Int(i64),

    /// Floating point number
    Float(f64),

    /// Text
    Str(String),

    /// Ordered sequence
    List(Arc<Vec<Value>>),

    /// Keyed mapping
    Map(Arc<BTreeMap<String, Value>>),

    /// Shared mutable slot, the only way to build a cyclic value
    Cell(ValueCell),

    /// A value that settles asynchronously
    Future(FutureValue),
}

impl Value {
    /// Build a [Value::List] from any iterable of values
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build a [Value::Map] from any iterable of key/value pairs
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }

    /// Build a [Value::Cell] holding the given value
    pub fn cell<V: Into<Value>>(value: V) -> Self {
        Value::Cell(ValueCell::new(value.into()))
    }

    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Cell(_) => "cell",
            Value::Future(_) => "future",
        }
    }

    /// Check if this is the absent result
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Integer content, if any
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric content as a float, integers included
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text content, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list, if any
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Future content, if any
    pub fn as_future(&self) -> Option<&FutureValue> {
        match self {
            Value::Future(future) => Some(future),
            _ => None,
        }
    }

    /// Member of a map by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    fn render(&self, f: &mut Formatter<'_>, visiting: &mut Vec<usize>) -> std::fmt::Result {
        match self {
            Value::Absent => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    item.render(f, visiting)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (index, (key, item)) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: ")?;
                    item.render(f, visiting)?;
                }
                write!(f, "}}")
            }
            Value::Cell(cell) => {
                if visiting.contains(&cell.address()) {
                    return write!(f, "[Circular]");
                }
                visiting.push(cell.address());
                let result = cell.get().render(f, visiting);
                visiting.pop();
                result
            }
            Value::Future(future) => match future.peek() {
                None => write!(f, "Future {{ <pending> }}"),
                Some(Ok(value)) => {
                    write!(f, "Future {{ resolved: ")?;
                    value.render(f, visiting)?;
                    write!(f, " }}")
                }
                Some(Err(error)) => write!(f, "Future {{ rejected: {error} }}"),
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Shared mutable slot of a [Value].
///
/// Cells are compared by reference in identity mode and by content in structural mode.
#[derive(Clone)]
pub struct ValueCell {
    slot: Arc<RwLock<Value>>,
}

impl ValueCell {
    /// Create a new cell holding the given value
    pub fn new(value: Value) -> Self {
        Self {
            slot: Arc::new(RwLock::new(value)),
        }
    }

    /// Clone of the current content
    pub fn get(&self) -> Value {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the content
    pub fn set(&self, value: Value) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Check if both cells are the same slot
    pub fn ptr_eq(&self, other: &ValueCell) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.slot) as *const () as usize
    }
}

impl Debug for ValueCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueCell({:#x})", self.address())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(Arc::new(value))
    }
}

impl From<ValueCell> for Value {
    fn from(value: ValueCell) -> Self {
        Value::Cell(value)
    }
}

impl From<FutureValue> for Value {
    fn from(value: FutureValue) -> Self {
        Value::Future(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::list(items),
            serde_json::Value::Object(entries) => Value::map(entries),
        }
    }
}

/// Build a vector of [Value] from heterogeneous expressions, each converted with `Value::from`.
///
/// ```
/// use standin_engine::{args, entities::Value};
///
/// let arguments: Vec<Value> = args![1, "two", 3.0];
/// assert_eq!(3, arguments.len());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::entities::Value>::new()
    };
    ( $($arg:expr),+ $(,)? ) => {
        vec![$($crate::entities::Value::from($arg)),+]
    };
}
