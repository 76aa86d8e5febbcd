//! The generic configuration tree every source produces and the decoder
//! consumes.
//!
//! A [`ConfigNode`] knows nothing about the shape it will be decoded into. It
//! is the common ground between text parsers, the env/argv unflattener and the
//! encoder, and it round-trips through any serde format.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Short kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }

    /// Equality used by literal matching: ints and floats compare numerically.
    pub fn loosely_equals(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Int(a), Scalar::Float(b)) | (Scalar::Float(b), Scalar::Int(a)) => {
                (*a as f64) == *b
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A node of the generic configuration tree.
///
/// Mappings are kept in key order so that rendering, flattening and error
/// messages are deterministic regardless of the source that produced them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigNode {
    #[default]
    Null,
    Scalar(Scalar),
    Sequence(Vec<ConfigNode>),
    Mapping(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    /// An empty mapping.
    pub fn mapping() -> Self {
        ConfigNode::Mapping(BTreeMap::new())
    }

    /// Build a mapping from `(key, node)` pairs. Later duplicates win.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ConfigNode)>,
    {
        ConfigNode::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a sequence from anything convertible into nodes.
    pub fn sequence<T: Into<ConfigNode>, I: IntoIterator<Item = T>>(items: I) -> Self {
        ConfigNode::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Short kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigNode::Null => "null",
            ConfigNode::Scalar(s) => s.kind(),
            ConfigNode::Sequence(_) => "sequence",
            ConfigNode::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigNode::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<ConfigNode>> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key if this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.as_mapping().and_then(|m| m.get(key))
    }
}

impl From<bool> for ConfigNode {
    fn from(v: bool) -> Self {
        ConfigNode::Scalar(Scalar::Bool(v))
    }
}

impl From<i64> for ConfigNode {
    fn from(v: i64) -> Self {
        ConfigNode::Scalar(Scalar::Int(v))
    }
}

impl From<i32> for ConfigNode {
    fn from(v: i32) -> Self {
        ConfigNode::Scalar(Scalar::Int(i64::from(v)))
    }
}

impl From<f64> for ConfigNode {
    fn from(v: f64) -> Self {
        ConfigNode::Scalar(Scalar::Float(v))
    }
}

impl From<&str> for ConfigNode {
    fn from(v: &str) -> Self {
        ConfigNode::Scalar(Scalar::Str(v.to_string()))
    }
}

impl From<String> for ConfigNode {
    fn from(v: String) -> Self {
        ConfigNode::Scalar(Scalar::Str(v))
    }
}

impl From<Scalar> for ConfigNode {
    fn from(v: Scalar) -> Self {
        ConfigNode::Scalar(v)
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(v: Vec<ConfigNode>) -> Self {
        ConfigNode::Sequence(v)
    }
}

impl From<BTreeMap<String, ConfigNode>> for ConfigNode {
    fn from(v: BTreeMap<String, ConfigNode>) -> Self {
        ConfigNode::Mapping(v)
    }
}

// --- serde ---

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigNode::Null => serializer.serialize_none(),
            ConfigNode::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            ConfigNode::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            ConfigNode::Scalar(Scalar::Float(x)) => serializer.serialize_f64(*x),
            ConfigNode::Scalar(Scalar::Str(s)) => serializer.serialize_str(s),
            ConfigNode::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigNode::Mapping(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = ConfigNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ConfigNode, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigNode, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigNode, E> {
        match i64::try_from(v) {
            Ok(i) => Ok(ConfigNode::from(i)),
            Err(_) => Ok(ConfigNode::Scalar(Scalar::Float(v as f64))),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ConfigNode, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigNode, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ConfigNode, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<ConfigNode, E> {
        Ok(ConfigNode::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<ConfigNode, E> {
        Ok(ConfigNode::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ConfigNode, D::Error> {
        ConfigNode::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ConfigNode, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ConfigNode::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ConfigNode, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<MapKey, ConfigNode>()? {
            map.insert(key.0, value);
        }
        Ok(ConfigNode::Mapping(map))
    }
}

impl<'de> Deserialize<'de> for ConfigNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

/// Mapping key that tolerates non-string keys (YAML allows `1: x`).
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = MapKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<MapKey, E> {
                Ok(MapKey(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_becomes_mapping() {
        let node: ConfigNode = serde_json::from_str(r#"{"a": 1, "b": [true, "x"]}"#).unwrap();
        assert_eq!(node.get("a").and_then(ConfigNode::as_i64), Some(1));
        let b = node.get("b").and_then(ConfigNode::as_sequence).unwrap();
        assert_eq!(b[0].as_bool(), Some(true));
        assert_eq!(b[1].as_str(), Some("x"));
    }

    #[test]
    fn json_null_becomes_null() {
        let node: ConfigNode = serde_json::from_str(r#"{"a": null}"#).unwrap();
        assert!(node.get("a").unwrap().is_null());
    }

    #[test]
    fn yaml_integer_keys_are_stringified() {
        let node: ConfigNode = serde_yaml::from_str("1: one\n2: two\n").unwrap();
        assert_eq!(node.get("1").and_then(ConfigNode::as_str), Some("one"));
    }

    #[test]
    fn serializes_back_to_json() {
        let node = ConfigNode::from_pairs([
            ("name", ConfigNode::from("svc")),
            ("ports", ConfigNode::sequence([80i64, 443])),
        ]);
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"name":"svc","ports":[80,443]}"#);
    }

    #[test]
    fn literal_equality_is_numeric() {
        assert!(Scalar::Int(2).loosely_equals(&Scalar::Float(2.0)));
        assert!(!Scalar::Int(2).loosely_equals(&Scalar::Str("2".into())));
    }

    #[test]
    fn kind_names() {
        assert_eq!(ConfigNode::Null.kind(), "null");
        assert_eq!(ConfigNode::mapping().kind(), "mapping");
        assert_eq!(ConfigNode::from(1.5).kind(), "float");
    }
}
