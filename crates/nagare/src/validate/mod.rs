//! Declarative validation of upstream responses.
//!
//! A [Schema] is a value-level AST interpreted by a single evaluator. Schemas are
//! immutable and cheap to clone, and never observe external state.
//!
//! ```
//! use nagare::validate::*;
//!
//! let schema = all([
//!     parse_json(),
//!     mapping([
//!         (required("code"), equals(200)),
//!         (required("content"), is_type(ValueType::Map)),
//!     ]),
//!     get("content"),
//! ]);
//! let value = schema.validate(r#"{"code":200,"content":{"a":1}}"#.into()).unwrap();
//! assert!(value.is_type(ValueType::Map));
//! ```

mod document;
mod error;
mod value;
mod xpath;

use std::{fmt, sync::Arc};

use regex::Regex;

pub use document::{Document, Node, NodeId, NodeKind};
pub use error::{PathSegment, ValidationError, ValidationErrorKind};
pub use value::{FromValue, RegexMatch, Value, ValueType};
pub use xpath::{XPath, XPathError, XPathItem};

/// Key of a mapping entry, an index into a sequence or a regex group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Name(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Name(value)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Index(value)
    }
}

impl From<&Key> for PathSegment {
    fn from(key: &Key) -> Self {
        match key {
            Key::Name(name) => PathSegment::Key(name.clone()),
            Key::Index(index) => PathSegment::Index(*index),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{name:?}"),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Key of a `mapping` entry. Keys not wrapped in `Optional` are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Required(String),
    Optional(String),
}

impl KeySpec {
    pub fn key(&self) -> &str {
        match self {
            KeySpec::Required(key) | KeySpec::Optional(key) => key,
        }
    }
}

type TransformFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Sub-schemas applied to the parts of a URL. Without a scheme schema only http(s) is accepted.
#[derive(Debug, Clone, Default)]
pub struct UrlSchema {
    pub scheme: Option<Box<Schema>>,
    pub host: Option<Box<Schema>>,
    pub path: Option<Box<Schema>>,
}

impl UrlSchema {
    pub fn scheme(mut self, schema: Schema) -> Self {
        self.scheme = Some(Box::new(schema));
        self
    }

    pub fn host(mut self, schema: Schema) -> Self {
        self.host = Some(Box::new(schema));
        self
    }

    pub fn path(mut self, schema: Schema) -> Self {
        self.path = Some(Box::new(schema));
        self
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    Equals(Value),
    Type(ValueType),
    All(Vec<Schema>),
    Any(Vec<Schema>),
    NoneOrAll(Vec<Schema>),
    Mapping(Vec<(KeySpec, Schema)>),
    SequenceOf(Box<Schema>),
    Get(Key),
    UnionGet(Vec<Key>),
    Union(Vec<Schema>),
    Transform(Transform),
    ParseJson,
    ParseHtml,
    ParseXml,
    XPathString(XPath),
    Regex(Regex),
    Url(UrlSchema),
    EndsWith(String),
    StartsWith(String),
}

impl Schema {
    /// Validates `value`, returning the normalized value.
    pub fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        let mut path = Vec::new();
        self.eval(value, &mut path)
    }

    /// Validates `value` and converts the result into `T`.
    pub fn validate_into<T: FromValue>(&self, value: Value) -> Result<T, ValidationError> {
        self.validate(value)?.into_typed()
    }

    fn eval(&self, value: Value, path: &mut Vec<PathSegment>) -> Result<Value, ValidationError> {
        match self {
            Schema::Equals(expected) => {
                if &value == expected {
                    Ok(value)
                } else {
                    Err(ValidationError::new(
                        ValidationErrorKind::Equality,
                        format!("{value:?} does not equal {expected:?}"),
                    )
                    .at(path))
                }
            }
            Schema::Type(ty) => {
                if value.is_type(*ty) {
                    Ok(value)
                } else {
                    Err(
                        ValidationError::type_mismatch(&ty.to_string(), value.type_name())
                            .at(path),
                    )
                }
            }
            Schema::All(schemas) => eval_chain(schemas, value, path),
            Schema::Any(schemas) => {
                let mut last_error = None;
                for schema in schemas {
                    match schema.eval(value.clone(), path) {
                        Ok(value) => return Ok(value),
                        Err(e) => last_error = Some(e),
                    }
                }
                Err(last_error.unwrap_or_else(|| {
                    ValidationError::new(ValidationErrorKind::NoAlternative, "No alternative")
                        .at(path)
                }))
            }
            Schema::NoneOrAll(schemas) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    eval_chain(schemas, value, path)
                }
            }
            Schema::Mapping(entries) => {
                let mut map = match value {
                    Value::Map(map) => map,
                    other => {
                        return Err(ValidationError::type_mismatch("mapping", other.type_name())
                            .at(path))
                    }
                };

                let mut result = std::collections::BTreeMap::new();
                for (spec, schema) in entries {
                    let key = spec.key();
                    match map.remove(key) {
                        Some(item) => {
                            path.push(PathSegment::Key(key.to_string()));
                            let item = schema.eval(item, path);
                            path.pop();
                            result.insert(key.to_string(), item?);
                        }
                        None if matches!(spec, KeySpec::Optional(_)) => {}
                        None => {
                            return Err(ValidationError::new(
                                ValidationErrorKind::MissingKey,
                                format!("Key {key:?} not found"),
                            )
                            .at(path))
                        }
                    }
                }
                Ok(Value::Map(result))
            }
            Schema::SequenceOf(schema) => {
                let items = match value {
                    Value::List(items) => items,
                    other => {
                        return Err(ValidationError::type_mismatch("sequence", other.type_name())
                            .at(path))
                    }
                };

                let mut result = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    let item = schema.eval(item, path);
                    path.pop();
                    result.push(item?);
                }
                Ok(Value::List(result))
            }
            Schema::Get(key) => get_key(&value, key, path),
            Schema::UnionGet(keys) => keys
                .iter()
                .map(|key| get_key(&value, key, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Schema::Union(schemas) => schemas
                .iter()
                .map(|schema| schema.eval(value.clone(), path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Schema::Transform(Transform(f)) => f(value).map_err(|message| {
                ValidationError::new(ValidationErrorKind::Transform, message).at(path)
            }),
            Schema::ParseJson => {
                let text = expect_str(&value, path)?;
                serde_json::from_str::<serde_json::Value>(text)
                    .map(Value::from)
                    .map_err(|e| {
                        ValidationError::new(
                            ValidationErrorKind::Parse,
                            format!("Unable to parse JSON: {e}"),
                        )
                        .at(path)
                    })
            }
            Schema::ParseHtml => {
                let text = expect_str(&value, path)?;
                Ok(Value::Document(Arc::new(Document::parse_html(text))))
            }
            Schema::ParseXml => {
                let text = expect_str(&value, path)?;
                Document::parse_xml(text)
                    .map(|doc| Value::Document(Arc::new(doc)))
                    .map_err(|e| {
                        ValidationError::new(
                            ValidationErrorKind::Parse,
                            format!("Unable to parse XML: {e}"),
                        )
                        .at(path)
                    })
            }
            Schema::XPathString(xpath) => {
                let Value::Document(document) = &value else {
                    return Err(ValidationError::type_mismatch("document", value.type_name())
                        .at(path));
                };
                Ok(xpath.evaluate_string(document).into())
            }
            Schema::Regex(regex) => {
                let text = expect_str(&value, path)?;
                match regex.captures(text) {
                    Some(captures) => Ok(Value::Match(RegexMatch::new(regex, &captures))),
                    None => Err(ValidationError::new(
                        ValidationErrorKind::Regex,
                        format!("Pattern {:?} did not match {text:?}", regex.as_str()),
                    )
                    .at(path)),
                }
            }
            Schema::Url(schema) => {
                let text = expect_str(&value, path)?;
                let url = url::Url::parse(text).map_err(|e| {
                    url_error(format!("{text:?} is not a valid URL: {e}"), path)
                })?;
                let Some(host) = url.host_str().filter(|h| !h.is_empty()) else {
                    return Err(url_error(format!("{text:?} has no host"), path));
                };

                match &schema.scheme {
                    Some(scheme) => {
                        path.push(PathSegment::Selector("url.scheme".to_string()));
                        let result = scheme.eval(url.scheme().into(), path);
                        path.pop();
                        result?;
                    }
                    None if !matches!(url.scheme(), "http" | "https") => {
                        return Err(url_error(format!("{text:?} is not an HTTP(S) URL"), path));
                    }
                    None => {}
                }
                if let Some(host_schema) = &schema.host {
                    path.push(PathSegment::Selector("url.host".to_string()));
                    let result = host_schema.eval(host.into(), path);
                    path.pop();
                    result?;
                }
                if let Some(path_schema) = &schema.path {
                    path.push(PathSegment::Selector("url.path".to_string()));
                    let result = path_schema.eval(url.path().into(), path);
                    path.pop();
                    result?;
                }
                Ok(value)
            }
            Schema::EndsWith(suffix) => {
                let text = expect_str(&value, path)?;
                if text.ends_with(suffix.as_str()) {
                    Ok(value)
                } else {
                    Err(ValidationError::new(
                        ValidationErrorKind::Predicate,
                        format!("{text:?} does not end with {suffix:?}"),
                    )
                    .at(path))
                }
            }
            Schema::StartsWith(prefix) => {
                let text = expect_str(&value, path)?;
                if text.starts_with(prefix.as_str()) {
                    Ok(value)
                } else {
                    Err(ValidationError::new(
                        ValidationErrorKind::Predicate,
                        format!("{text:?} does not start with {prefix:?}"),
                    )
                    .at(path))
                }
            }
        }
    }
}

/// Runs `schemas` in order. A successful `get` extends the breadcrumb for the rest of the chain.
fn eval_chain(
    schemas: &[Schema],
    value: Value,
    path: &mut Vec<PathSegment>,
) -> Result<Value, ValidationError> {
    let depth = path.len();
    let result: Result<Value, ValidationError> =
        schemas.iter().try_fold(value, |value, schema| {
            let value = schema.eval(value, path)?;
            if let Schema::Get(key) = schema {
                path.push(key.into());
            }
            Ok(value)
        });
    path.truncate(depth);
    result
}

fn expect_str<'v>(value: &'v Value, path: &[PathSegment]) -> Result<&'v str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::type_mismatch("string", value.type_name()).at(path))
}

fn url_error(message: String, path: &[PathSegment]) -> ValidationError {
    ValidationError::new(ValidationErrorKind::Url, message).at(path)
}

fn get_key(value: &Value, key: &Key, path: &mut Vec<PathSegment>) -> Result<Value, ValidationError> {
    let found = match (value, key) {
        (Value::Map(map), Key::Name(name)) => map.get(name).cloned(),
        (Value::List(items), Key::Index(index)) => items.get(*index).cloned(),
        (Value::Match(m), Key::Index(index)) if m.has_group(*index) => {
            Some(m.group(*index).map(Value::from).unwrap_or(Value::Null))
        }
        (Value::Match(m), Key::Name(name)) if m.has_name(name) => {
            Some(m.name(name).map(Value::from).unwrap_or(Value::Null))
        }
        (Value::Map(_) | Value::List(_) | Value::Match(_), _) => None,
        (other, _) => {
            return Err(ValidationError::type_mismatch(
                "mapping, sequence or match",
                other.type_name(),
            )
            .at(path))
        }
    };

    found.ok_or_else(|| {
        path.push(key.into());
        let error = ValidationError::new(
            ValidationErrorKind::MissingKey,
            format!("Key {key} not found"),
        )
        .at(path);
        path.pop();
        error
    })
}

pub fn equals(value: impl Into<Value>) -> Schema {
    Schema::Equals(value.into())
}

pub fn is_type(ty: ValueType) -> Schema {
    Schema::Type(ty)
}

pub fn all(schemas: impl IntoIterator<Item = Schema>) -> Schema {
    Schema::All(schemas.into_iter().collect())
}

pub fn any(schemas: impl IntoIterator<Item = Schema>) -> Schema {
    Schema::Any(schemas.into_iter().collect())
}

pub fn none_or_all(schemas: impl IntoIterator<Item = Schema>) -> Schema {
    Schema::NoneOrAll(schemas.into_iter().collect())
}

pub fn required(key: &str) -> KeySpec {
    KeySpec::Required(key.to_string())
}

pub fn optional(key: &str) -> KeySpec {
    KeySpec::Optional(key.to_string())
}

pub fn mapping(entries: impl IntoIterator<Item = (KeySpec, Schema)>) -> Schema {
    Schema::Mapping(entries.into_iter().collect())
}

pub fn sequence_of(schema: Schema) -> Schema {
    Schema::SequenceOf(Box::new(schema))
}

pub fn get(key: impl Into<Key>) -> Schema {
    Schema::Get(key.into())
}

pub fn union_get<K: Into<Key>>(keys: impl IntoIterator<Item = K>) -> Schema {
    Schema::UnionGet(keys.into_iter().map(Into::into).collect())
}

pub fn union(schemas: impl IntoIterator<Item = Schema>) -> Schema {
    Schema::Union(schemas.into_iter().collect())
}

pub fn transform<F, E>(f: F) -> Schema
where
    F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    Schema::Transform(Transform(Arc::new(move |value| {
        f(value).map_err(|e| e.to_string())
    })))
}

pub fn parse_json() -> Schema {
    Schema::ParseJson
}

pub fn parse_html() -> Schema {
    Schema::ParseHtml
}

pub fn parse_xml() -> Schema {
    Schema::ParseXml
}

pub fn xpath_string(xpath: XPath) -> Schema {
    Schema::XPathString(xpath)
}

pub fn regex(regex: Regex) -> Schema {
    Schema::Regex(regex)
}

/// An HTTP(S) URL with a host.
pub fn url() -> Schema {
    url_with(UrlSchema::default())
}

pub fn url_with(schema: UrlSchema) -> Schema {
    Schema::Url(schema)
}

/// A URL whose path component satisfies `path`.
pub fn url_with_path(path: Schema) -> Schema {
    url_with(UrlSchema::default().path(path))
}

pub fn endswith(suffix: &str) -> Schema {
    Schema::EndsWith(suffix.to_string())
}

pub fn startswith(prefix: &str) -> Schema {
    Schema::StartsWith(prefix.to_string())
}
