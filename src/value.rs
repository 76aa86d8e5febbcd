//! Typed values produced by the decoder.
//!
//! Unlike a [`ConfigNode`](crate::ConfigNode), a [`Value`] has already been
//! checked against a descriptor: a `Duration` really is a duration, a `Record`
//! carries exactly the declared fields, and an `Enum` names a real member.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, TimeDelta};

use crate::error::ConftreeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    DateTime(DateTime<FixedOffset>),
    Duration(TimeDelta),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Record),
    Enum(EnumValue),
}

/// A selected enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub member: String,
    pub ordinal: i64,
}

/// A decoded record: its descriptor name and fields in declaration order.
///
/// For polymorphic decodes, `name` tells which variant matched and `variant`
/// holds its qualified name. Encoding writes `variant` back as the `_type`
/// discriminant.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub variant: Option<String>,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variant: None,
            fields: Vec::new(),
        }
    }

    /// Mark the record as the polymorphic variant `qualified`.
    pub fn variant(mut self, qualified: &str) -> Self {
        self.variant = Some(qualified.to_string());
        self
    }

    /// Append a field (builder style, used by `Shape` impls).
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.push((name.to_string(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Remove a field, failing with a structural error naming `path` if it
    /// was never decoded.
    pub fn take(&mut self, name: &str, path: &str) -> Result<Value, ConftreeError> {
        match self.fields.iter().position(|(n, _)| n == name) {
            Some(idx) => Ok(self.fields.remove(idx).1),
            None => Err(ConftreeError::malformed(
                path,
                format!("no {name} found in record {}", self.name),
            )),
        }
    }
}

impl Value {
    /// Short kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Path(_) => "path",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Enum(_) => "enum",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}
