use std::{collections::BTreeMap, fmt, sync::Arc};

use super::{document::Document, error::ValidationError};

/// A value flowing through a [Schema](super::Schema).
///
/// JSON documents, parsed markup, regex matches and intermediate tuples all share this
/// representation so that schemas can be composed freely.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// JSON arrays and tuples produced by `union` / `union_get`
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Document(Arc<Document>),
    Match(RegexMatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    Map,
    Sequence,
    Null,
    /// A string which parses as an absolute URL with a host
    Url,
    Document,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Int => "integer",
            ValueType::Float => "float",
            ValueType::Bool => "boolean",
            ValueType::Map => "mapping",
            ValueType::Sequence => "sequence",
            ValueType::Null => "null",
            ValueType::Url => "url",
            ValueType::Document => "document",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Document(_) => "document",
            Value::Match(_) => "match",
        }
    }

    pub fn is_type(&self, ty: ValueType) -> bool {
        match (ty, self) {
            (ValueType::String, Value::String(_)) => true,
            (ValueType::Int, Value::Int(_)) => true,
            (ValueType::Float, Value::Float(_)) => true,
            (ValueType::Bool, Value::Bool(_)) => true,
            (ValueType::Map, Value::Map(_)) => true,
            (ValueType::Sequence, Value::List(_)) => true,
            (ValueType::Null, Value::Null) => true,
            (ValueType::Url, Value::String(s)) => url::Url::parse(s)
                .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
                .unwrap_or(false),
            (ValueType::Document, Value::Document(_)) => true,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a validated value into a typed Rust value.
    pub fn into_typed<T: FromValue>(self) -> Result<T, ValidationError> {
        T::from_value(self)
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
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

/// Owned result of a successful regex match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexMatch {
    groups: Vec<Option<String>>,
    names: BTreeMap<String, usize>,
}

impl RegexMatch {
    pub fn new(regex: &regex::Regex, captures: &regex::Captures<'_>) -> Self {
        let groups = captures
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let names = regex
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| name.map(|name| (name.to_string(), i)))
            .collect();

        Self { groups, names }
    }

    /// Group by index. Group 0 is the whole match.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.names.get(name).and_then(|i| self.group(*i))
    }

    pub fn has_group(&self, index: usize) -> bool {
        index < self.groups.len()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }
}

pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValidationError>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T, ValidationError> {
    Err(ValidationError::type_mismatch(expected, value.type_name()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Ok(s),
            other => mismatch("string", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Int(i) => Ok(i),
            other => mismatch("integer", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => mismatch("float", &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch("boolean", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|e| e.within_index(i)))
                .collect(),
            other => mismatch("sequence", &other),
        }
    }
}

macro_rules! tuple_from_value {
    ($len:literal => $($name:ident),+) => {
        impl<$($name: FromValue),+> FromValue for ($($name,)+) {
            fn from_value(value: Value) -> Result<Self, ValidationError> {
                let items = match value {
                    Value::List(items) if items.len() == $len => items,
                    Value::List(items) => {
                        return Err(ValidationError::type_mismatch(
                            concat!("tuple of length ", $len),
                            &format!("tuple of length {}", items.len()),
                        ))
                    }
                    other => return mismatch("tuple", &other),
                };

                let mut items = items.into_iter().enumerate();
                Ok(($(
                    {
                        let (i, item) = items
                            .next()
                            .ok_or_else(|| ValidationError::type_mismatch("tuple", "shorter tuple"))?;
                        $name::from_value(item).map_err(|e| e.within_index(i))?
                    },
                )+))
            }
        }
    };
}

tuple_from_value!(1 => A);
tuple_from_value!(2 => A, B);
tuple_from_value!(3 => A, B, C);
tuple_from_value!(4 => A, B, C, D);
tuple_from_value!(5 => A, B, C, D, E);
tuple_from_value!(6 => A, B, C, D, E, F);
tuple_from_value!(7 => A, B, C, D, E, F, G);
tuple_from_value!(8 => A, B, C, D, E, F, G, H);
