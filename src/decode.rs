//! Type-directed decoding: walk a [`TypeDescriptor`] and a [`ConfigNode`] in
//! lock-step and produce a [`Value`].
//!
//! Decoding stops at the first error for the subtree being processed. The two
//! exceptions are union branches and polymorphic variants, where every
//! candidate is tried and the outcomes are collected before deciding.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::trace;

use crate::error::{ConftreeError, display_path};
use crate::iso8601;
use crate::node::{ConfigNode, Scalar};
use crate::schema::{EnumDescriptor, RecordDescriptor, ScalarKind, TypeDescriptor};
use crate::value::{EnumValue, Record, Value};

/// Reserved key naming the intended variant of a polymorphic value.
pub const DISCRIMINANT_KEY: &str = "_type";

/// Nesting depth beyond which decoding gives up with a structural error.
pub const MAX_DEPTH: usize = 128;

/// Decode `node` against `schema` with default options (strict scalars,
/// unexpected keys rejected).
pub fn decode(node: &ConfigNode, schema: &TypeDescriptor) -> Result<Value, ConftreeError> {
    Decoder::new().decode(node, schema)
}

/// Decoding options.
///
/// - `strict` (default `true`): `bool`/`int`/`float` must already have that
///   kind. When off, text such as `"8080"` or `"true"` is coerced first.
/// - `ignore_unexpected` (default `false`): tolerate input keys that no record
///   field consumes.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    strict: bool,
    ignore_unexpected: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            strict: true,
            ignore_unexpected: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn ignore_unexpected(mut self, ignore: bool) -> Self {
        self.ignore_unexpected = ignore;
        self
    }

    pub fn decode(&self, node: &ConfigNode, schema: &TypeDescriptor) -> Result<Value, ConftreeError> {
        self.decode_at(node, schema, "", 0)
    }

    fn decode_at(
        &self,
        node: &ConfigNode,
        schema: &TypeDescriptor,
        path: &str,
        depth: usize,
    ) -> Result<Value, ConftreeError> {
        if depth > MAX_DEPTH {
            return Err(too_deep(path));
        }
        let depth = depth + 1;

        match schema {
            TypeDescriptor::Record(record) => self
                .decode_record(node, record, path, depth)
                .map(Value::Record),
            TypeDescriptor::List { elem } => {
                let Some(elem) = elem else {
                    return Err(ConftreeError::missing_type(
                        path,
                        "expected list with type information: List[?]",
                    ));
                };
                let items = sequence_of(node, schema, path, "list")?;
                let elem_path = format!("{path}[]");
                items
                    .iter()
                    .map(|item| self.decode_at(item, elem, &elem_path, depth))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            TypeDescriptor::Tuple { elems, variadic } => {
                self.decode_tuple(node, schema, elems, *variadic, path, depth)
            }
            TypeDescriptor::Mapping { value, .. } => {
                let Some(value_ty) = value else {
                    return Err(ConftreeError::missing_type(
                        path,
                        "expected dict with type information: Dict[?, ?]",
                    ));
                };
                match node {
                    ConfigNode::Null => Ok(Value::Null),
                    ConfigNode::Mapping(map) => map
                        .iter()
                        .map(|(k, v)| {
                            self.decode_at(v, value_ty, &format!("{path}.{k}"), depth)
                                .map(|decoded| (k.clone(), decoded))
                        })
                        .collect::<Result<BTreeMap<_, _>, _>>()
                        .map(Value::Map),
                    other => Err(ConftreeError::mismatch(path, schema, other.kind())),
                }
            }
            TypeDescriptor::Optional(inner) => match node {
                ConfigNode::Null => Ok(Value::Null),
                present => self.decode_at(present, inner, path, depth),
            },
            TypeDescriptor::Union(branches) => self.decode_union(node, schema, branches, path, depth),
            TypeDescriptor::Enum(e) => decode_enum(node, e, path),
            TypeDescriptor::Literal(allowed) => match node {
                ConfigNode::Scalar(s) if allowed.iter().any(|a| a.loosely_equals(s)) => {
                    Ok(scalar_value(s.clone()))
                }
                other => Err(ConftreeError::mismatch(path, schema, describe_node(other))),
            },
            TypeDescriptor::Scalar(kind) => self.decode_scalar(node, *kind, path),
            TypeDescriptor::Opaque => opaque(node, path, depth),
            TypeDescriptor::Polymorphic { base, variants } => {
                self.decode_polymorphic(node, base, variants, path, depth)
            }
        }
    }

    fn decode_record(
        &self,
        node: &ConfigNode,
        record: &RecordDescriptor,
        path: &str,
        depth: usize,
    ) -> Result<Record, ConftreeError> {
        let input = match node {
            ConfigNode::Mapping(map) => map,
            ConfigNode::Null => {
                return Err(ConftreeError::malformed(
                    path,
                    format!("expected type {} but received null", record.name),
                ));
            }
            other => return Err(ConftreeError::mismatch(path, &record.name, other.kind())),
        };

        let mut consumed: BTreeSet<&str> = BTreeSet::new();
        let mut out = Record::new(&record.name);

        for field in &record.fields {
            let field_path = format!("{path}.{}", field.name);
            let alias = field.dash_alias();

            let resolved = if let Some(v) = input.get(&field.name) {
                consumed.insert(field.name.as_str());
                Some(v.clone())
            } else if let Some((key, v)) = alias
                .as_deref()
                .and_then(|a| input.get_key_value(a))
            {
                consumed.insert(key.as_str());
                Some(v.clone())
            } else {
                field.default.produce()
            };

            let value = match resolved {
                Some(v) => self.decode_at(&v, &field.ty, &field_path, depth)?,
                None if field.ty.is_optional() => Value::Null,
                None => {
                    return Err(ConftreeError::malformed(
                        path,
                        format!(
                            "expected type {}, no {} found in record",
                            record.name, field.name
                        ),
                    ));
                }
            };
            out.fields.push((field.name.clone(), value));
        }

        let unexpected: Vec<String> = input
            .keys()
            .filter(|k| !consumed.contains(k.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() && !self.ignore_unexpected {
            return Err(ConftreeError::UnexpectedKeys {
                path: display_path(path),
                type_name: record.name.clone(),
                keys: unexpected,
            });
        }

        Ok(out)
    }

    fn decode_tuple(
        &self,
        node: &ConfigNode,
        schema: &TypeDescriptor,
        elems: &[TypeDescriptor],
        variadic: bool,
        path: &str,
        depth: usize,
    ) -> Result<Value, ConftreeError> {
        if elems.is_empty() {
            return Err(ConftreeError::missing_type(
                path,
                "expected tuple with type information: Tuple[?]",
            ));
        }
        if variadic && elems.len() != 1 {
            return Err(ConftreeError::missing_type(
                path,
                "expected one type since the tuple is variadic: Tuple[?, ...]",
            ));
        }
        let items = sequence_of(node, schema, path, "tuple")?;
        if !variadic && !items.is_empty() && items.len() != elems.len() {
            return Err(ConftreeError::malformed(
                path,
                format!(
                    "number of provided values ({}) does not match expected number of values for tuple ({})",
                    items.len(),
                    elems.len()
                ),
            ));
        }

        let elem_path = format!("{path}[]");
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let ty = if variadic { &elems[0] } else { &elems[i] };
                self.decode_at(item, ty, &elem_path, depth)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Tuple)
    }

    fn decode_union(
        &self,
        node: &ConfigNode,
        schema: &TypeDescriptor,
        branches: &[TypeDescriptor],
        path: &str,
        depth: usize,
    ) -> Result<Value, ConftreeError> {
        for branch in branches {
            match self.decode_at(node, branch, path, depth) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    trace!(path = %display_path(path), branch = %branch, error = %e, "union branch rejected");
                }
            }
        }
        Err(ConftreeError::mismatch(
            path,
            format!("one of {schema}"),
            describe_node(node),
        ))
    }

    fn decode_polymorphic(
        &self,
        node: &ConfigNode,
        base: &str,
        variants: &[RecordDescriptor],
        path: &str,
        depth: usize,
    ) -> Result<Value, ConftreeError> {
        let ConfigNode::Mapping(map) = node else {
            return Err(ConftreeError::mismatch(path, base, node.kind()));
        };

        let mut map = map.clone();
        let discriminant = match map.remove(DISCRIMINANT_KEY) {
            None => None,
            Some(ConfigNode::Scalar(Scalar::Str(s))) => Some(s),
            Some(other) => {
                return Err(ConftreeError::mismatch(
                    &format!("{path}.{DISCRIMINANT_KEY}"),
                    "str",
                    other.kind(),
                ));
            }
        };
        let stripped = ConfigNode::Mapping(map);

        let mut candidates: Vec<&RecordDescriptor> = variants
            .iter()
            .filter(|v| {
                discriminant
                    .as_deref()
                    .is_none_or(|d| v.qualified_name().ends_with(d))
            })
            .collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));

        let mut successes: Vec<Record> = Vec::new();
        let mut failures: Vec<ConftreeError> = Vec::new();
        for variant in candidates {
            match self.decode_record(&stripped, variant, path, depth) {
                Ok(record) => successes.push(record.variant(&variant.qualified_name())),
                Err(e) => failures.push(e),
            }
        }

        trace!(
            path = %display_path(path),
            base,
            matched = successes.len(),
            failed = failures.len(),
            "polymorphic candidates tried"
        );

        match successes.len() {
            1 => Ok(Value::Record(successes.remove(0))),
            n if n > 1 => Err(ConftreeError::AmbiguousPolymorphicMatch {
                path: display_path(path),
                base: base.to_string(),
                variants: successes.into_iter().map(|record| record.name).collect(),
            }),
            _ if !failures.is_empty() => {
                let detail: Vec<String> = failures.iter().map(ToString::to_string).collect();
                Err(ConftreeError::mismatch(
                    path,
                    format!("{base}, failed variants:\n- {}", detail.join("\n- ")),
                    "mapping",
                ))
            }
            _ => Err(ConftreeError::mismatch(
                path,
                match &discriminant {
                    Some(d) => format!("{base} variant matching '{d}'"),
                    None => format!("{base} (no variants registered)"),
                },
                "mapping",
            )),
        }
    }

    fn decode_scalar(
        &self,
        node: &ConfigNode,
        kind: ScalarKind,
        path: &str,
    ) -> Result<Value, ConftreeError> {
        let coerced;
        let node = if self.strict {
            node
        } else {
            coerced = coerce(node, kind);
            coerced.as_ref().unwrap_or(node)
        };

        match (kind, node) {
            (ScalarKind::Bool, ConfigNode::Scalar(Scalar::Bool(b))) => Ok(Value::Bool(*b)),
            (ScalarKind::Int, ConfigNode::Scalar(Scalar::Int(i))) => Ok(Value::Int(*i)),
            (ScalarKind::Float, ConfigNode::Scalar(Scalar::Float(x))) => Ok(Value::Float(*x)),
            (ScalarKind::Float, ConfigNode::Scalar(Scalar::Int(i))) => Ok(Value::Float(*i as f64)),
            (ScalarKind::String, ConfigNode::Scalar(Scalar::Str(s))) => Ok(Value::Str(s.clone())),
            (ScalarKind::Path, ConfigNode::Scalar(Scalar::Str(s))) => {
                Ok(Value::Path(PathBuf::from(s)))
            }
            (ScalarKind::DateTime, ConfigNode::Scalar(Scalar::Str(s))) => {
                iso8601::parse_datetime(s)
                    .map(Value::DateTime)
                    .map_err(|reason| ConftreeError::parse_failure(path, reason))
            }
            (ScalarKind::Duration, ConfigNode::Scalar(Scalar::Str(s))) => {
                iso8601::parse_duration(s)
                    .map(Value::Duration)
                    .map_err(|reason| ConftreeError::parse_failure(path, reason))
            }
            (kind, other) => Err(ConftreeError::mismatch(path, kind, other.kind())),
        }
    }
}

/// Best-effort text coercion for non-strict decoding. `None` means "leave the
/// node alone and let the kind check report it".
fn coerce(node: &ConfigNode, kind: ScalarKind) -> Option<ConfigNode> {
    let ConfigNode::Scalar(Scalar::Str(text)) = node else {
        return None;
    };
    let text = text.trim();
    match kind {
        ScalarKind::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(ConfigNode::from(true)),
            "false" | "no" | "off" | "0" => Some(ConfigNode::from(false)),
            _ => None,
        },
        ScalarKind::Int => text.parse::<i64>().ok().map(ConfigNode::from),
        ScalarKind::Float => text.parse::<f64>().ok().map(ConfigNode::from),
        _ => None,
    }
}

fn sequence_of<'a>(
    node: &'a ConfigNode,
    schema: &TypeDescriptor,
    path: &str,
    what: &str,
) -> Result<&'a Vec<ConfigNode>, ConftreeError> {
    match node {
        ConfigNode::Sequence(items) => Ok(items),
        ConfigNode::Null => Err(ConftreeError::malformed(
            path,
            format!("expected {what} but received null"),
        )),
        other => Err(ConftreeError::mismatch(path, schema, other.kind())),
    }
}

fn decode_enum(node: &ConfigNode, e: &EnumDescriptor, path: &str) -> Result<Value, ConftreeError> {
    let member = match node {
        ConfigNode::Scalar(Scalar::Int(i)) => e.by_ordinal(*i),
        ConfigNode::Scalar(Scalar::Str(s)) => e.by_text(s),
        other => {
            return Err(ConftreeError::mismatch(
                path,
                format!("str or int for {}", e.name),
                other.kind(),
            ));
        }
    };
    member
        .map(|m| {
            Value::Enum(EnumValue {
                member: m.name.clone(),
                ordinal: m.ordinal,
            })
        })
        .ok_or_else(|| {
            let names: Vec<&str> = e.members.iter().map(|m| m.name.as_str()).collect();
            ConftreeError::mismatch(
                path,
                format!("one of {} members [{}]", e.name, names.join(", ")),
                describe_node(node),
            )
        })
}

fn scalar_value(s: Scalar) -> Value {
    match s {
        Scalar::Bool(b) => Value::Bool(b),
        Scalar::Int(i) => Value::Int(i),
        Scalar::Float(x) => Value::Float(x),
        Scalar::Str(s) => Value::Str(s),
    }
}

/// Keep a tree as-is, converted node for node.
pub(crate) fn opaque(node: &ConfigNode, path: &str, depth: usize) -> Result<Value, ConftreeError> {
    if depth > MAX_DEPTH {
        return Err(too_deep(path));
    }
    let value = match node {
        ConfigNode::Null => Value::Null,
        ConfigNode::Scalar(s) => scalar_value(s.clone()),
        ConfigNode::Sequence(items) => {
            let elem_path = format!("{path}[]");
            items
                .iter()
                .map(|item| opaque(item, &elem_path, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)?
        }
        ConfigNode::Mapping(map) => map
            .iter()
            .map(|(k, v)| opaque(v, &format!("{path}.{k}"), depth + 1).map(|v| (k.clone(), v)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Value::Map)?,
    };
    Ok(value)
}

pub(crate) fn too_deep(path: &str) -> ConftreeError {
    ConftreeError::malformed(path, format!("nesting exceeds {MAX_DEPTH} levels"))
}

/// Kind plus the scalar itself, for messages about rejected values.
fn describe_node(node: &ConfigNode) -> String {
    match node {
        ConfigNode::Scalar(s) => format!("{} {s}", s.kind()),
        other => other.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::*;
    use crate::schema::{EnumDescriptor, Field};
    use chrono::TimeDelta;

    fn yaml(text: &str) -> ConfigNode {
        serde_yaml::from_str(text).unwrap()
    }

    // --- records ---

    #[test]
    fn simple_record() {
        let schema: TypeDescriptor = RecordDescriptor::new("A")
            .with("a", TypeDescriptor::string())
            .into();
        let value = decode(&yaml("a: test"), &schema).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Value::from("test")));
    }

    #[test]
    fn optional_field_absent_is_null() {
        let schema: TypeDescriptor = RecordDescriptor::new("B")
            .with("b", TypeDescriptor::optional(TypeDescriptor::string()))
            .into();
        let value = decode(&ConfigNode::mapping(), &schema).unwrap();
        assert_eq!(value.as_record().unwrap().get("b"), Some(&Value::Null));

        let value = decode(&yaml("b: test"), &schema).unwrap();
        assert_eq!(value.as_record().unwrap().get("b"), Some(&Value::from("test")));
    }

    #[test]
    fn optional_present_but_wrong_propagates() {
        let schema: TypeDescriptor = RecordDescriptor::new("B")
            .with("b", TypeDescriptor::optional(TypeDescriptor::int()))
            .into();
        let err = decode(&yaml("b: nope"), &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
        assert_eq!(err.path(), Some("<root>.b"));
    }

    #[test]
    fn required_field_missing_is_malformed() {
        let err = decode(&yaml("host: x"), &server_schema()).unwrap_err();
        assert!(matches!(err, ConftreeError::MalformedStructure { .. }));
        assert!(err.to_string().contains("no port found"));
    }

    #[test]
    fn defaults_fill_absent_fields() {
        let value = decode(&yaml("port: 9000"), &server_schema()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("host"), Some(&Value::from("localhost")));
        assert_eq!(record.get("port"), Some(&Value::Int(9000)));
        assert_eq!(
            record.get("tags"),
            Some(&Value::List(vec![Value::from("default")]))
        );
    }

    #[test]
    fn defaults_are_decoded_through_the_field_type() {
        let schema: TypeDescriptor = RecordDescriptor::new("T")
            .field(Field::new("ttl", TypeDescriptor::duration()).default("PT5M"))
            .into();
        let value = decode(&ConfigNode::mapping(), &schema).unwrap();
        assert_eq!(
            value.as_record().unwrap().get("ttl"),
            Some(&Value::Duration(TimeDelta::minutes(5)))
        );
    }

    #[test]
    fn dash_alias_is_accepted() {
        let value = decode(&yaml("port: 1\nmax-connections: 5"), &server_schema()).unwrap();
        assert_eq!(
            value.as_record().unwrap().get("max_connections"),
            Some(&Value::Int(5))
        );
    }

    #[test]
    fn exact_name_wins_over_alias_and_alias_becomes_unexpected() {
        let err = decode(
            &yaml("port: 1\nmax_connections: 5\nmax-connections: 6"),
            &server_schema(),
        )
        .unwrap_err();
        match err {
            ConftreeError::UnexpectedKeys { keys, .. } => {
                assert_eq!(keys, vec!["max-connections".to_string()]);
            }
            other => panic!("Expected UnexpectedKeys, got: {other:?}"),
        }
    }

    #[test]
    fn unexpected_keys_rejected_then_ignored() {
        let input = yaml("port: 1\ntypo: 2\nother: 3");
        let err = decode(&input, &server_schema()).unwrap_err();
        match &err {
            ConftreeError::UnexpectedKeys { keys, type_name, .. } => {
                assert_eq!(keys, &vec!["other".to_string(), "typo".to_string()]);
                assert_eq!(type_name, "Server");
            }
            other => panic!("Expected UnexpectedKeys, got: {other:?}"),
        }

        let value = Decoder::new()
            .ignore_unexpected(true)
            .decode(&input, &server_schema())
            .unwrap();
        assert_eq!(value.as_record().unwrap().get("port"), Some(&Value::Int(1)));
    }

    #[test]
    fn record_from_null_is_malformed() {
        let err = decode(&ConfigNode::Null, &server_schema()).unwrap_err();
        assert!(matches!(err, ConftreeError::MalformedStructure { .. }));
    }

    #[test]
    fn record_from_scalar_is_mismatch() {
        let err = decode(&ConfigNode::from("x"), &server_schema()).unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
    }

    #[test]
    fn nested_record_error_path() {
        let schema: TypeDescriptor = RecordDescriptor::new("App")
            .with("server", server_schema())
            .into();
        let err = decode(&yaml("server:\n  port: high"), &schema).unwrap_err();
        assert_eq!(err.path(), Some("<root>.server.port"));
    }

    // --- containers ---

    #[test]
    fn list_without_element_type() {
        let err = decode(&yaml("[1]"), &TypeDescriptor::List { elem: None }).unwrap_err();
        assert!(matches!(err, ConftreeError::MissingTypeParameter { .. }));
    }

    #[test]
    fn list_from_null_is_malformed() {
        let schema = TypeDescriptor::list(TypeDescriptor::int());
        let err = decode(&ConfigNode::Null, &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::MalformedStructure { .. }));
    }

    #[test]
    fn list_element_error_path() {
        let schema = TypeDescriptor::list(TypeDescriptor::int());
        let err = decode(&yaml("[1, two]"), &schema).unwrap_err();
        assert_eq!(err.path(), Some("<root>[]"));
    }

    #[test]
    fn tuple_fixed_arity() {
        let schema = TypeDescriptor::tuple(vec![
            TypeDescriptor::int(),
            TypeDescriptor::string(),
            TypeDescriptor::duration(),
        ]);
        let value = decode(&yaml(r#"[1, "2", "P1D"]"#), &schema).unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![
                Value::Int(1),
                Value::from("2"),
                Value::Duration(TimeDelta::days(1)),
            ])
        );

        let err = decode(&yaml(r#"[1, "2"]"#), &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::MalformedStructure { .. }));
    }

    #[test]
    fn variadic_tuple_takes_any_length() {
        let schema = TypeDescriptor::variadic_tuple(TypeDescriptor::int());
        let value = decode(&yaml("[1, 2, 3]"), &schema).unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn variadic_tuple_needs_exactly_one_type() {
        let schema = TypeDescriptor::Tuple {
            elems: vec![TypeDescriptor::int(), TypeDescriptor::int()],
            variadic: true,
        };
        let err = decode(&yaml("[1]"), &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::MissingTypeParameter { .. }));
    }

    #[test]
    fn mapping_values_decoded_keys_passed_through() {
        let schema = TypeDescriptor::map(TypeDescriptor::int());
        let value = decode(&yaml("a: 1\nB: 2"), &schema).unwrap();
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map.get("B"), Some(&Value::Int(2)));
    }

    #[test]
    fn mapping_null_is_null_and_untyped_is_missing() {
        let schema = TypeDescriptor::map(TypeDescriptor::int());
        assert_eq!(decode(&ConfigNode::Null, &schema).unwrap(), Value::Null);

        let untyped = TypeDescriptor::Mapping {
            key: None,
            value: None,
        };
        let err = decode(&yaml("a: 1"), &untyped).unwrap_err();
        assert!(matches!(err, ConftreeError::MissingTypeParameter { .. }));
    }

    // --- unions ---

    #[test]
    fn union_takes_first_matching_branch() {
        let schema = TypeDescriptor::union(vec![TypeDescriptor::int(), TypeDescriptor::string()]);
        assert_eq!(decode(&yaml("3"), &schema).unwrap(), Value::Int(3));
        assert_eq!(decode(&yaml("x"), &schema).unwrap(), Value::from("x"));
    }

    #[test]
    fn union_prefers_declaration_order_when_both_match() {
        let loose: TypeDescriptor = RecordDescriptor::new("Loose")
            .with("name", TypeDescriptor::string())
            .into();
        let other: TypeDescriptor = RecordDescriptor::new("AlsoLoose")
            .with("name", TypeDescriptor::string())
            .into();
        let schema = TypeDescriptor::union(vec![loose, other]);
        let value = decode(&yaml("name: x"), &schema).unwrap();
        assert_eq!(value.as_record().unwrap().name, "Loose");
    }

    #[test]
    fn union_failure_lists_branches() {
        let schema = TypeDescriptor::union(vec![TypeDescriptor::int(), TypeDescriptor::bool()]);
        let err = decode(&yaml("x"), &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
        assert!(err.to_string().contains("Union[int, bool]"));
    }

    // --- enums and literals ---

    #[test]
    fn enum_by_name_and_ordinal() {
        let schema: TypeDescriptor = EnumDescriptor::new("Color", &["Red", "Green"]).into();
        let by_name = decode(&yaml("Green"), &schema).unwrap();
        let by_ordinal = decode(&yaml("2"), &schema).unwrap();
        assert_eq!(by_name, by_ordinal);
        assert!(decode(&yaml("Blue"), &schema).is_err());
        assert!(decode(&yaml("true"), &schema).is_err());
    }

    #[test]
    fn string_backed_enum_by_value() {
        let schema: TypeDescriptor =
            EnumDescriptor::string_backed("Level", &[("Low", "low"), ("High", "high")]).into();
        let value = decode(&yaml("high"), &schema).unwrap();
        assert_eq!(
            value,
            Value::Enum(EnumValue {
                member: "High".into(),
                ordinal: 2
            })
        );
    }

    #[test]
    fn literal_membership() {
        let schema = TypeDescriptor::literal([Scalar::Str("a".into()), Scalar::Int(1)]);
        assert_eq!(decode(&yaml("a"), &schema).unwrap(), Value::from("a"));
        assert_eq!(decode(&yaml("1"), &schema).unwrap(), Value::Int(1));
        let err = decode(&yaml("b"), &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
    }

    // --- scalars ---

    #[test]
    fn strict_scalars_reject_text() {
        let err = decode(&ConfigNode::from("8080"), &TypeDescriptor::int()).unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
    }

    #[test]
    fn lenient_scalars_coerce_text() {
        let lenient = Decoder::new().strict(false);
        assert_eq!(
            lenient.decode(&ConfigNode::from("8080"), &TypeDescriptor::int()).unwrap(),
            Value::Int(8080)
        );
        assert_eq!(
            lenient.decode(&ConfigNode::from("TRUE"), &TypeDescriptor::bool()).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            lenient.decode(&ConfigNode::from("1.5"), &TypeDescriptor::float()).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn lenient_coercion_failure_reports_mismatch() {
        let err = Decoder::new()
            .strict(false)
            .decode(&ConfigNode::from("eighty"), &TypeDescriptor::int())
            .unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
    }

    #[test]
    fn float_accepts_int() {
        assert_eq!(
            decode(&ConfigNode::from(2i64), &TypeDescriptor::float()).unwrap(),
            Value::Float(2.0)
        );
    }

    #[test]
    fn string_rejects_number() {
        assert!(decode(&ConfigNode::from(2i64), &TypeDescriptor::string()).is_err());
    }

    #[test]
    fn path_wraps_string() {
        assert_eq!(
            decode(&ConfigNode::from("/etc/app"), &TypeDescriptor::path()).unwrap(),
            Value::Path(PathBuf::from("/etc/app"))
        );
    }

    #[test]
    fn datetime_parse_failure_is_generic_parse() {
        let err = decode(&ConfigNode::from("soon"), &TypeDescriptor::datetime()).unwrap_err();
        assert!(matches!(err, ConftreeError::GenericParseFailure { .. }));
    }

    #[test]
    fn calendar_duration_rejected() {
        let err = decode(&ConfigNode::from("P1M"), &TypeDescriptor::duration()).unwrap_err();
        assert!(matches!(err, ConftreeError::GenericParseFailure { .. }));
    }

    #[test]
    fn opaque_passes_through() {
        let value = decode(&yaml("a: [1, x]"), &TypeDescriptor::Opaque).unwrap();
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(
            map.get("a"),
            Some(&Value::List(vec![Value::Int(1), Value::from("x")]))
        );
    }

    // --- polymorphic ---

    #[test]
    fn polymorphic_ambiguous_without_discriminant() {
        let err = decode(&yaml("bar: Baz"), &ambiguous_schema()).unwrap_err();
        match err {
            ConftreeError::AmbiguousPolymorphicMatch { variants, .. } => {
                assert_eq!(variants, vec!["VariantOne".to_string(), "VariantTwo".to_string()]);
            }
            other => panic!("Expected AmbiguousPolymorphicMatch, got: {other:?}"),
        }
    }

    #[test]
    fn polymorphic_discriminant_narrows() {
        let value = decode(&yaml("_type: VariantTwo\nbar: Baz"), &ambiguous_schema()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.name, "VariantTwo");
        assert_eq!(record.get("bar"), Some(&Value::from("Baz")));
    }

    #[test]
    fn polymorphic_discriminant_matches_qualified_suffix() {
        let value = decode(
            &yaml("_type: variants::VariantOne\nbar: Baz"),
            &ambiguous_schema(),
        )
        .unwrap();
        assert_eq!(value.as_record().unwrap().name, "VariantOne");
    }

    #[test]
    fn polymorphic_picks_the_only_fitting_shape() {
        let value = decode(&yaml("path: /tmp/in"), &input_schema()).unwrap();
        assert_eq!(value.as_record().unwrap().name, "FileInput");

        let value = decode(&yaml("url: http://x\ntimeout: PT5S"), &input_schema()).unwrap();
        assert_eq!(value.as_record().unwrap().name, "HttpInput");
    }

    #[test]
    fn polymorphic_no_match_aggregates_failures() {
        let err = decode(&yaml("nothing: here"), &input_schema()).unwrap_err();
        assert!(matches!(err, ConftreeError::TypeMismatch { .. }));
        let msg = err.to_string();
        assert!(msg.contains("failed variants"));
        assert!(msg.contains("FileInput"));
        assert!(msg.contains("HttpInput"));
    }

    #[test]
    fn polymorphic_unknown_discriminant() {
        let err = decode(&yaml("_type: Nope\npath: x"), &input_schema()).unwrap_err();
        assert!(err.to_string().contains("matching 'Nope'"));
    }

    // --- depth ---

    #[test]
    fn depth_ceiling_is_structural_error() {
        let mut schema = TypeDescriptor::int();
        let mut node = ConfigNode::from(1i64);
        for _ in 0..(MAX_DEPTH + 5) {
            schema = TypeDescriptor::list(schema);
            node = ConfigNode::Sequence(vec![node]);
        }
        let err = decode(&node, &schema).unwrap_err();
        assert!(matches!(err, ConftreeError::MalformedStructure { .. }));
        assert!(err.to_string().contains("nesting exceeds"));
    }

    #[test]
    fn opaque_depth_is_bounded() {
        let mut node = ConfigNode::from(1i64);
        for _ in 0..(MAX_DEPTH + 5) {
            node = ConfigNode::from_pairs([("a", node)]);
        }
        let err = decode(&node, &TypeDescriptor::Opaque).unwrap_err();
        assert!(matches!(err, ConftreeError::MalformedStructure { .. }));
        assert!(err.path().is_some_and(|p| p.starts_with("<root>.a.a")));
    }

    #[test]
    fn polymorphic_record_remembers_its_variant() {
        let value = decode(&yaml("path: /tmp/in"), &input_schema()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.variant.as_deref(), Some("inputs::FileInput"));

        let plain = decode(&yaml("port: 1"), &server_schema()).unwrap();
        assert_eq!(plain.as_record().unwrap().variant, None);
    }
}
