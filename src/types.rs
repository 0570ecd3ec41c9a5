use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlTemplateError;
use crate::record::Record;

/// Values that can be supplied as template parameters and returned as bind arguments.
///
/// The scalar variants mirror what SQL drivers accept; `List` feeds `in` expansion and
/// `Record` / `Json` objects can be walked with dotted paths:
/// ```rust
/// use sql_template::prelude::*;
///
/// let params = Params::new()
///     .with("id", 1)
///     .with("name", "alice")
///     .with("ids", vec![1, 2, 3]);
/// # let _ = params;
/// ```
#[derive(Clone)]
pub enum Value {
    /// NULL, and the stand-in for an absent record or reference
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Binary data
    Blob(Vec<u8>),
    /// JSON value; objects are traversable, arrays expand under `in`
    Json(JsonValue),
    /// Sequence of values
    List(Vec<Value>),
    /// User type exposing fields and accessors to dotted paths
    Record(Arc<dyn Record>),
}

impl Value {
    /// Wrap a [`Record`] implementation.
    pub fn record<R: Record + 'static>(record: R) -> Self {
        Value::Record(Arc::new(record))
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(JsonValue::Null))
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let Value::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let Value::Bool(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let Value::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let Value::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Elements of a sequence value (`List` or a JSON array).
    ///
    /// Returns `None` for scalars, so `in` can fall back to a single placeholder.
    #[must_use]
    pub fn sequence(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Json(JsonValue::Array(items)) => {
                Some(items.iter().cloned().map(Value::from).collect())
            }
            _ => None,
        }
    }

    /// Template truthiness: zero values and empty containers are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Timestamp(_) | Value::Record(_) => true,
            Value::Blob(bytes) => !bytes.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Json(json) => match json {
                JsonValue::Null => false,
                JsonValue::Bool(b) => *b,
                JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                JsonValue::String(s) => !s.is_empty(),
                JsonValue::Array(items) => !items.is_empty(),
                JsonValue::Object(map) => !map.is_empty(),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Timestamp(ts) => f.debug_tuple("Timestamp").field(ts).finish(),
            Value::Blob(bytes) => f.debug_tuple("Blob").field(bytes).finish(),
            Value::Json(json) => f.debug_tuple("Json").field(json).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Record(record) => f.debug_tuple("Record").field(record).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // records have no structural equality; identity is the best we can do
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Text form used when a value is written straight into the rendered SQL.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Blob(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Json(JsonValue::String(s)) => f.write_str(s),
            Value::Json(json) => write!(f, "{json}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Record(record) => write!(f, "{record:?}"),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

/// Unsigned values past `i64::MAX` fall back to `Float`, as large JSON numbers do.
macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                #[allow(clippy::cast_precision_loss)]
                fn from(v: $t) -> Self {
                    i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
                }
            }
        )*
    };
}

impl_from_unsigned!(u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// JSON scalars become native variants; objects stay JSON so they remain traversable.
impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Json(JsonValue::Number(n)), Value::Float),
            },
            JsonValue::String(s) => Value::Text(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            object @ JsonValue::Object(_) => Value::Json(object),
        }
    }
}

/// A bound argument as returned by named renders.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArg {
    pub name: String,
    pub value: Value,
}

impl NamedArg {
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Placeholder mode of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Ordinal (`$1`) or plain (`?`) placeholders; arguments come back as a value list.
    #[default]
    Positional,
    /// Named (`:name`) placeholders; arguments come back as name/value pairs.
    Named,
}

/// Top-level parameters of one render, keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: BTreeMap<String, Value>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TryFrom<JsonValue> for Params {
    type Error = SqlTemplateError;

    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        match json {
            JsonValue::Object(map) => Ok(map.into_iter().collect()),
            JsonValue::Null => Ok(Params::new()),
            other => Err(SqlTemplateError::ParameterError(format!(
                "expected a JSON object of parameters, got {other}"
            ))),
        }
    }
}
