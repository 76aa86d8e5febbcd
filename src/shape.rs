//! The bridge between Rust types and the descriptor/value model.
//!
//! A type implementing [`Shape`] names its [`TypeDescriptor`] and converts
//! to and from a decoded [`Value`]. Implementations are provided for the
//! standard scalars and containers; records and enums implement it by hand,
//! usually with [`expect_record`], [`Record::extract`] and [`expect_enum`].
//!
//! ```ignore
//! impl Shape for Server {
//!     fn descriptor() -> TypeDescriptor {
//!         RecordDescriptor::new("Server")
//!             .field(Field::new("host", String::descriptor()).default("localhost"))
//!             .with("port", u16::descriptor())
//!             .into()
//!     }
//!
//!     fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
//!         let mut record = expect_record(value, "Server", path)?;
//!         Ok(Server {
//!             host: record.extract("host", path)?,
//!             port: record.extract("port", path)?,
//!         })
//!     }
//!
//!     fn to_value(&self) -> Value {
//!         Record::new("Server")
//!             .with("host", self.host.to_value())
//!             .with("port", self.port.to_value())
//!             .into()
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, TimeDelta};

use crate::decode::{self, Decoder};
use crate::encode::encode;
use crate::error::ConftreeError;
use crate::node::ConfigNode;
use crate::schema::TypeDescriptor;
use crate::value::{EnumValue, Record, Value};

pub trait Shape: Sized {
    fn descriptor() -> TypeDescriptor;

    /// Convert a value produced by decoding [`Shape::descriptor`]. `path` is
    /// the breadcrumb used in errors (`""` at the root).
    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError>;

    fn to_value(&self) -> Value;

    /// Decode a tree straight into `Self` with default decoder options.
    fn from_node(node: &ConfigNode) -> Result<Self, ConftreeError> {
        Self::from_node_with(&Decoder::new(), node)
    }

    fn from_node_with(decoder: &Decoder, node: &ConfigNode) -> Result<Self, ConftreeError> {
        let value = decoder.decode(node, &Self::descriptor())?;
        Self::from_value(value, "")
    }

    fn to_node(&self) -> Result<ConfigNode, ConftreeError> {
        encode(&self.to_value())
    }
}

/// Unwrap a record value, checking it is the record `name`.
pub fn expect_record(value: Value, name: &str, path: &str) -> Result<Record, ConftreeError> {
    match value {
        Value::Record(record) if record.name == name => Ok(record),
        Value::Record(record) => Err(ConftreeError::mismatch(path, name, record.name)),
        other => Err(ConftreeError::mismatch(path, name, other.kind())),
    }
}

/// Unwrap an enum value.
pub fn expect_enum(value: Value, path: &str) -> Result<EnumValue, ConftreeError> {
    match value {
        Value::Enum(e) => Ok(e),
        other => Err(ConftreeError::mismatch(path, "enum", other.kind())),
    }
}

impl Record {
    /// Take field `name` and convert it into `T`.
    pub fn extract<T: Shape>(&mut self, name: &str, path: &str) -> Result<T, ConftreeError> {
        let value = self.take(name, path)?;
        T::from_value(value, &format!("{path}.{name}"))
    }
}

impl Shape for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::bool()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ConftreeError::mismatch(path, "bool", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! int_shape {
    ($($ty:ty),*) => {
        $(
            impl Shape for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::int()
                }

                fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                            ConftreeError::mismatch(
                                path,
                                concat!("int within ", stringify!($ty), " range"),
                                format!("int {i}"),
                            )
                        }),
                        other => Err(ConftreeError::mismatch(path, "int", other.kind())),
                    }
                }

                fn to_value(&self) -> Value {
                    // Values beyond i64 only arise for u64 and saturate.
                    Value::Int(i64::try_from(*self).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

int_shape!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl Shape for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(ConftreeError::mismatch(path, "float", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Shape for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        f64::from_value(value, path).map(|x| x as f32)
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Shape for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::string()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ConftreeError::mismatch(path, "str", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl Shape for PathBuf {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::path()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Str(s) => Ok(PathBuf::from(s)),
            other => Err(ConftreeError::mismatch(path, "path", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::Path(self.clone())
    }
}

impl Shape for DateTime<FixedOffset> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::datetime()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(ConftreeError::mismatch(path, "datetime", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl Shape for TimeDelta {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::duration()
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Duration(d) => Ok(d),
            other => Err(ConftreeError::mismatch(path, "duration", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::Duration(*self)
    }
}

/// Anything at all; kept as a raw tree. Trees nested deeper than
/// [`MAX_DEPTH`](crate::MAX_DEPTH) convert to `Value::Null`, the decoder
/// never produces them.
impl Shape for ConfigNode {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Opaque
    }

    fn from_value(value: Value, _path: &str) -> Result<Self, ConftreeError> {
        encode(&value)
    }

    fn to_value(&self) -> Value {
        decode::opaque(self, "", 0).unwrap_or(Value::Null)
    }
}

impl<T: Shape> Shape for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::descriptor())
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, path).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Shape::to_value)
    }
}

impl<T: Shape> Shape for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::List(items) | Value::Tuple(items) => {
                let elem_path = format!("{path}[]");
                items
                    .into_iter()
                    .map(|item| T::from_value(item, &elem_path))
                    .collect()
            }
            other => Err(ConftreeError::mismatch(path, "list", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Shape::to_value).collect())
    }
}

impl<T: Shape> Shape for BTreeMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        match value {
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| {
                    let item = T::from_value(v, &format!("{path}.{k}"))?;
                    Ok((k, item))
                })
                .collect(),
            Value::Null => Ok(BTreeMap::new()),
            other => Err(ConftreeError::mismatch(path, "map", other.kind())),
        }
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: Shape> Shape for HashMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        BTreeMap::<String, T>::from_value(value, path).map(|m| m.into_iter().collect())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

fn tuple_items(value: Value, arity: usize, path: &str) -> Result<Vec<Value>, ConftreeError> {
    match value {
        Value::Tuple(items) | Value::List(items) if items.len() == arity => Ok(items),
        Value::Tuple(items) | Value::List(items) => Err(ConftreeError::malformed(
            path,
            format!("expected {arity} tuple values, got {}", items.len()),
        )),
        other => Err(ConftreeError::mismatch(path, "tuple", other.kind())),
    }
}

impl<A: Shape, B: Shape> Shape for (A, B) {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::tuple(vec![A::descriptor(), B::descriptor()])
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        let mut items = tuple_items(value, 2, path)?.into_iter();
        let elem_path = format!("{path}[]");
        match (items.next(), items.next()) {
            (Some(a), Some(b)) => Ok((A::from_value(a, &elem_path)?, B::from_value(b, &elem_path)?)),
            _ => Err(ConftreeError::malformed(path, "expected 2 tuple values")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Tuple(vec![self.0.to_value(), self.1.to_value()])
    }
}

impl<A: Shape, B: Shape, C: Shape> Shape for (A, B, C) {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::tuple(vec![A::descriptor(), B::descriptor(), C::descriptor()])
    }

    fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
        let mut items = tuple_items(value, 3, path)?.into_iter();
        let elem_path = format!("{path}[]");
        match (items.next(), items.next(), items.next()) {
            (Some(a), Some(b), Some(c)) => Ok((
                A::from_value(a, &elem_path)?,
                B::from_value(b, &elem_path)?,
                C::from_value(c, &elem_path)?,
            )),
            _ => Err(ConftreeError::malformed(path, "expected 3 tuple values")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Tuple(vec![self.0.to_value(), self.1.to_value(), self.2.to_value()])
    }
}
