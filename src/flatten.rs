//! Custom serde Serializer that flattens any `Serialize` value into flat
//! key-value pairs, the inverse of [`unflatten`](crate::unflatten()).
//!
//! Two styles are provided:
//!
//! - [`Flattener::env`]: `PREFIX_A__B_0` keys, with a doubled separator after
//!   every nested mapping key and upper-cased output. Feeding the pairs back
//!   through `unflatten` with the same prefix rebuilds the tree.
//! - [`Flattener::dotted`]: `a.b.0` keys, used by the properties renderer.
//!
//! `None`/null values and empty containers have no flat form and are skipped.

use serde::ser::{self, Serialize};

use crate::error::ConftreeError;

/// Flatten `source` into env-style pairs under `prefix`.
///
/// `Server { db: Db { url: "pg://" }, hosts: ["a"] }` with prefix `APP`
/// becomes `[("APP_DB__URL", "pg://"), ("APP_HOSTS_0", "a")]`.
pub fn flatten<S: Serialize + ?Sized>(
    prefix: &str,
    source: &S,
) -> Result<Vec<(String, String)>, ConftreeError> {
    Flattener::env().flatten(prefix, source)
}

#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    separator: char,
    boundaries: bool,
    uppercase: bool,
}

impl Flattener {
    pub fn env() -> Self {
        Self {
            separator: '_',
            boundaries: true,
            uppercase: true,
        }
    }

    pub fn dotted() -> Self {
        Self {
            separator: '.',
            boundaries: false,
            uppercase: false,
        }
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn flatten<S: Serialize + ?Sized>(
        &self,
        prefix: &str,
        source: &S,
    ) -> Result<Vec<(String, String)>, ConftreeError> {
        self.flatten_raw(prefix, source)
            .map_err(|e| ConftreeError::malformed("", e.0))
    }

    pub(crate) fn flatten_raw<S: Serialize + ?Sized>(
        &self,
        prefix: &str,
        source: &S,
    ) -> Result<Vec<(String, String)>, FlattenError> {
        let mut out = Vec::new();
        let serializer = FlattenSerializer {
            path: Vec::new(),
            out: &mut out,
            boundaries: self.boundaries,
        };
        source.serialize(serializer)?;

        let sep = self.separator.to_string();
        Ok(out
            .into_iter()
            .map(|(segments, value)| {
                let mut key = segments.join(&sep);
                if self.uppercase {
                    key = key.to_uppercase();
                }
                let key = if prefix.is_empty() {
                    key
                } else if prefix.ends_with(self.separator) {
                    format!("{prefix}{key}")
                } else {
                    format!("{prefix}{sep}{key}")
                };
                (key, value)
            })
            .collect())
    }
}

#[derive(Debug)]
pub(crate) struct FlattenError(pub(crate) String);

impl std::fmt::Display for FlattenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "flatten error: {}", self.0)
    }
}

impl std::error::Error for FlattenError {}

impl ser::Error for FlattenError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        FlattenError(msg.to_string())
    }
}

type Out = Vec<(Vec<String>, String)>;

struct FlattenSerializer<'a> {
    path: Vec<String>,
    out: &'a mut Out,
    boundaries: bool,
}

impl FlattenSerializer<'_> {
    fn emit(self, text: String) -> Result<(), FlattenError> {
        if self.path.is_empty() {
            return Err(FlattenError(
                "only mappings and records can be flattened".into(),
            ));
        }
        self.out.push((self.path, text));
        Ok(())
    }
}

/// Path of a mapping member. Below the top level, a nested key is preceded by
/// an empty segment so it joins as a doubled separator.
fn member_path(path: &[String], key: String, boundaries: bool) -> Vec<String> {
    let mut p = path.to_vec();
    if boundaries && !path.is_empty() {
        p.push(String::new());
    }
    p.push(key);
    p
}

impl<'a> ser::Serializer for FlattenSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;
    type SerializeSeq = FlattenSeqSerializer<'a>;
    type SerializeTuple = FlattenSeqSerializer<'a>;
    type SerializeTupleStruct = FlattenSeqSerializer<'a>;
    type SerializeTupleVariant = FlattenSeqSerializer<'a>;
    type SerializeMap = FlattenMapSerializer<'a>;
    type SerializeStruct = FlattenStructSerializer<'a>;
    type SerializeStructVariant = FlattenStructSerializer<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), Self::Error> {
        self.emit(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<(), Self::Error> {
        self.emit(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<(), Self::Error> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<(), Self::Error> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<(), Self::Error> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<(), Self::Error> {
        self.emit(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Result<(), Self::Error> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Result<(), Self::Error> {
        self.emit(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<(), Self::Error> {
        self.emit(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<(), Self::Error> {
        self.emit(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), Self::Error> {
        Err(FlattenError("bytes not supported".into()))
    }

    fn serialize_none(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Self::Error> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        if self.path.is_empty() {
            return Err(FlattenError("a top-level sequence has no flat form".into()));
        }
        Ok(FlattenSeqSerializer {
            path: self.path,
            out: self.out,
            boundaries: self.boundaries,
            index: 0,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(FlattenMapSerializer {
            path: self.path,
            out: self.out,
            boundaries: self.boundaries,
            current_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(FlattenStructSerializer {
            path: self.path,
            out: self.out,
            boundaries: self.boundaries,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(FlattenStructSerializer {
            path: self.path,
            out: self.out,
            boundaries: self.boundaries,
        })
    }
}

// --- SerializeStruct ---

struct FlattenStructSerializer<'a> {
    path: Vec<String>,
    out: &'a mut Out,
    boundaries: bool,
}

impl ser::SerializeStruct for FlattenStructSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        let serializer = FlattenSerializer {
            path: member_path(&self.path, key.to_string(), self.boundaries),
            out: self.out,
            boundaries: self.boundaries,
        };
        value.serialize(serializer)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FlattenStructSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// --- SerializeMap ---

struct FlattenMapSerializer<'a> {
    path: Vec<String>,
    out: &'a mut Out,
    boundaries: bool,
    current_key: Option<String>,
}

impl ser::SerializeMap for FlattenMapSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        self.current_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| FlattenError("serialize_value called without serialize_key".into()))?;
        let serializer = FlattenSerializer {
            path: member_path(&self.path, key, self.boundaries),
            out: self.out,
            boundaries: self.boundaries,
        };
        value.serialize(serializer)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// --- SerializeSeq (lists and tuples, one key per element) ---

struct FlattenSeqSerializer<'a> {
    path: Vec<String>,
    out: &'a mut Out,
    boundaries: bool,
    index: usize,
}

impl ser::SerializeSeq for FlattenSeqSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let mut path = self.path.clone();
        path.push(self.index.to_string());
        self.index += 1;
        value.serialize(FlattenSerializer {
            path,
            out: self.out,
            boundaries: self.boundaries,
        })
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ser::SerializeTuple for FlattenSeqSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for FlattenSeqSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for FlattenSeqSerializer<'_> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

// --- Key serializer (map keys to path segments) ---

struct KeySerializer;

fn key_error() -> FlattenError {
    FlattenError("map keys must be strings, integers or booleans".into())
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = FlattenError;
    type SerializeSeq = ser::Impossible<String, FlattenError>;
    type SerializeTuple = ser::Impossible<String, FlattenError>;
    type SerializeTupleStruct = ser::Impossible<String, FlattenError>;
    type SerializeTupleVariant = ser::Impossible<String, FlattenError>;
    type SerializeMap = ser::Impossible<String, FlattenError>;
    type SerializeStruct = ser::Impossible<String, FlattenError>;
    type SerializeStructVariant = ser::Impossible<String, FlattenError>;

    fn serialize_str(self, v: &str) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_char(self, v: char) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_bool(self, v: bool) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_i8(self, v: i8) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_i16(self, v: i16) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_i32(self, v: i32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_i64(self, v: i64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_u8(self, v: u8) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_u16(self, v: u16) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_u32(self, v: u32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_u64(self, v: u64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }
    fn serialize_f32(self, _: f32) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_f64(self, _: f64) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_bytes(self, _: &[u8]) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_none(self) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, _: &T) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_unit(self) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<String, Self::Error> {
        Ok(variant.to_string())
    }
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<String, Self::Error> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<String, Self::Error> {
        Err(key_error())
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(key_error())
    }
    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(key_error())
    }
    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(key_error())
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(key_error())
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(key_error())
    }
    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(key_error())
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(key_error())
    }
}
