use std::collections::BTreeMap;

use crate::decode::{DISCRIMINANT_KEY, MAX_DEPTH, too_deep};
use crate::error::ConftreeError;
use crate::iso8601;
use crate::node::ConfigNode;
use crate::value::Value;

/// Encode a typed value back into a generic tree.
///
/// Records become mappings keyed by field name, plus a `_type` key when the
/// record was picked from a polymorphic family. Paths, datetimes and
/// durations become their text forms, enums their member name. Decoding the
/// result with the same descriptor yields an equal value.
///
/// Values nested deeper than [`MAX_DEPTH`] are rejected with
/// [`ConftreeError::MalformedStructure`].
pub fn encode(value: &Value) -> Result<ConfigNode, ConftreeError> {
    encode_at(value, "", 0)
}

fn encode_at(value: &Value, path: &str, depth: usize) -> Result<ConfigNode, ConftreeError> {
    if depth > MAX_DEPTH {
        return Err(too_deep(path));
    }
    let depth = depth + 1;

    let node = match value {
        Value::Null => ConfigNode::Null,
        Value::Bool(b) => ConfigNode::from(*b),
        Value::Int(i) => ConfigNode::from(*i),
        Value::Float(x) => ConfigNode::from(*x),
        Value::Str(s) => ConfigNode::from(s.as_str()),
        Value::Path(p) => ConfigNode::from(p.to_string_lossy().into_owned()),
        Value::DateTime(dt) => ConfigNode::from(iso8601::format_datetime(dt)),
        Value::Duration(d) => ConfigNode::from(iso8601::format_duration(d)),
        Value::List(items) | Value::Tuple(items) => {
            let elem_path = format!("{path}[]");
            ConfigNode::Sequence(
                items
                    .iter()
                    .map(|item| encode_at(item, &elem_path, depth))
                    .collect::<Result<_, _>>()?,
            )
        }
        Value::Map(map) => ConfigNode::Mapping(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), encode_at(v, &format!("{path}.{k}"), depth)?)))
                .collect::<Result<_, ConftreeError>>()?,
        ),
        Value::Record(record) => {
            let mut fields = record
                .fields
                .iter()
                .map(|(name, v)| {
                    Ok((name.clone(), encode_at(v, &format!("{path}.{name}"), depth)?))
                })
                .collect::<Result<BTreeMap<_, _>, ConftreeError>>()?;
            if let Some(variant) = &record.variant {
                fields.insert(DISCRIMINANT_KEY.to_string(), ConfigNode::from(variant.as_str()));
            }
            ConfigNode::Mapping(fields)
        }
        Value::Enum(e) => ConfigNode::from(e.member.as_str()),
    };
    Ok(node)
}
