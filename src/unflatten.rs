//! Turn flat `PREFIX_A__B_0` style keys into a nested [`ConfigNode`].
//!
//! Keys are lower-cased, stripped of `prefix` and split on the separator.
//! Each segment is one of:
//!
//! - an **index** (all digits), addressing a sequence element;
//! - a **boundary** (empty, from a doubled separator), ending a mapping key;
//! - a **key**, anything else.
//!
//! A path `p` is applied to the current container `focus` like this:
//!
//! 1. One segment left: assign the value. Into a sequence, the index must be
//!    exactly the current length.
//! 2. `p[1]` is a boundary: descend into the mapping at `p[0]`, creating it if
//!    needed, and continue with `p[2..]`.
//! 3. `p[1]` is an index and either `0` or the child at `p[0]` is already a
//!    sequence: descend into that sequence and continue with `p[1..]`.
//! 4. Otherwise `p[0]` and `p[1]` are rejoined with the separator into one key,
//!    so field names may contain the separator themselves.
//!
//! Paths are applied in sorted key order, so `A_0` is placed before `A__B`
//! tries to treat `a` as a mapping. A key with more than
//! [`MAX_DEPTH`](crate::MAX_DEPTH) segments is rejected.
//!
//! A key ending with the separator carries a whole configuration blob, parsed
//! with the configured [`Format`] instead of being kept as text.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::decode::MAX_DEPTH;
use crate::error::ConftreeError;
use crate::node::ConfigNode;
use crate::types::Format;

/// Unflatten with the default separator (`_`) and YAML blobs.
pub fn unflatten(
    prefix: &str,
    pairs: impl IntoIterator<Item = (String, String)>,
) -> Result<ConfigNode, ConftreeError> {
    Unflattener::new().unflatten(prefix, pairs)
}

#[derive(Debug, Clone, Copy)]
pub struct Unflattener {
    separator: char,
    blob_format: Format,
}

impl Default for Unflattener {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Boundary,
    Index(usize),
    Key(String),
}

impl Segment {
    fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Segment::Boundary;
        }
        if text.bytes().all(|b| b.is_ascii_digit())
            && let Ok(i) = text.parse::<usize>()
        {
            return Segment::Index(i);
        }
        Segment::Key(text.to_string())
    }

    /// The mapping key this segment names, if it can name one.
    fn as_key(&self) -> Option<String> {
        match self {
            Segment::Boundary => None,
            Segment::Index(i) => Some(i.to_string()),
            Segment::Key(k) => Some(k.clone()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Boundary => Ok(()),
            Segment::Index(i) => write!(f, "{i}"),
            Segment::Key(k) => f.write_str(k),
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Same order as sorting the raw keys (digits before the separator), except
// that indexes compare numerically so `_10` lands after `_9`.
impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(s: &Segment) -> u8 {
            match s {
                Segment::Index(_) => 0,
                Segment::Boundary => 1,
                Segment::Key(_) => 2,
            }
        }
        match (self, other) {
            (Segment::Index(a), Segment::Index(b)) => a.cmp(b),
            (Segment::Key(a), Segment::Key(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

struct Entry {
    key: String,
    path: Vec<Segment>,
    value: ConfigNode,
}

impl Unflattener {
    pub fn new() -> Self {
        Self {
            separator: '_',
            blob_format: Format::Yaml,
        }
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Format used to parse values whose key ends with the separator.
    pub fn blob_format(mut self, format: Format) -> Self {
        self.blob_format = format;
        self
    }

    /// Build a mapping from every pair whose key starts with `prefix`.
    ///
    /// Matching is case-insensitive. An empty prefix matches every key.
    pub fn unflatten(
        &self,
        prefix: &str,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<ConfigNode, ConftreeError> {
        let mut needle = prefix.to_lowercase();
        if !needle.is_empty() && !needle.ends_with(self.separator) {
            needle.push(self.separator);
        }

        let mut entries = Vec::new();
        for (key, raw) in pairs {
            let lowered = key.to_lowercase();
            let Some(rest) = lowered.strip_prefix(&needle) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            let (rest, value) = match rest.strip_suffix(self.separator) {
                Some(stripped) => (stripped, self.parse_blob(&key, &raw)?),
                None => (rest, ConfigNode::from(raw)),
            };
            let path: Vec<Segment> = rest.split(self.separator).map(Segment::parse).collect();
            if path.len() > MAX_DEPTH {
                return Err(invalid_key(&key, &format!("nests deeper than {MAX_DEPTH} levels")));
            }
            entries.push(Entry { key, path, value });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.key.cmp(&b.key)));
        debug!(prefix, matched = entries.len(), "unflattening keys");

        let mut root = ConfigNode::mapping();
        for entry in entries {
            self.assign(&entry.key, &entry.path, &mut root, entry.value)?;
        }
        Ok(root)
    }

    fn parse_blob(&self, key: &str, text: &str) -> Result<ConfigNode, ConftreeError> {
        let nested = |source: ConftreeError| ConftreeError::NestedBlobParseFailure {
            key: key.to_string(),
            source: Box::new(source),
        };
        match self.blob_format.parse(text).map_err(nested)? {
            node @ (ConfigNode::Mapping(_) | ConfigNode::Sequence(_)) => Ok(node),
            other => Err(nested(ConftreeError::malformed(
                "",
                format!("expected a mapping or sequence, got {}", other.kind()),
            ))),
        }
    }

    fn assign(
        &self,
        key: &str,
        path: &[Segment],
        focus: &mut ConfigNode,
        value: ConfigNode,
    ) -> Result<(), ConftreeError> {
        match path {
            [] => Err(invalid_key(key, "path ends on an object boundary")),
            [leaf] => assign_leaf(key, leaf, focus, value),
            [head, Segment::Boundary, rest @ ..] => {
                let child = child_of(key, head, focus, ConfigNode::mapping())?;
                self.assign(key, rest, child, value)
            }
            [head, Segment::Index(i), ..] if *i == 0 || holds_sequence(focus, head) => {
                let child = child_of(key, head, focus, ConfigNode::Sequence(Vec::new()))?;
                self.assign(key, &path[1..], child, value)
            }
            [head, next, rest @ ..] => {
                let mut joined = Vec::with_capacity(rest.len() + 1);
                joined.push(Segment::Key(format!("{head}{}{next}", self.separator)));
                joined.extend(rest.iter().cloned());
                self.assign(key, &joined, focus, value)
            }
        }
    }
}

fn assign_leaf(
    key: &str,
    leaf: &Segment,
    focus: &mut ConfigNode,
    value: ConfigNode,
) -> Result<(), ConftreeError> {
    match focus {
        ConfigNode::Mapping(map) => {
            let name = leaf
                .as_key()
                .ok_or_else(|| invalid_key(key, "path ends on an object boundary"))?;
            map.insert(name, value);
            Ok(())
        }
        ConfigNode::Sequence(items) => match leaf {
            Segment::Index(i) if *i == items.len() => {
                items.push(value);
                Ok(())
            }
            Segment::Index(i) => Err(ConftreeError::ListOrderViolation {
                key: key.to_string(),
                expected: items.len(),
                found: *i,
            }),
            other => Err(list_format(key, other)),
        },
        _ => Err(invalid_key(key, "descends through a value set by another key")),
    }
}

/// The container at `head` inside `focus`, inserting `fresh` if it is absent.
fn child_of<'a>(
    key: &str,
    head: &Segment,
    focus: &'a mut ConfigNode,
    fresh: ConfigNode,
) -> Result<&'a mut ConfigNode, ConftreeError> {
    match focus {
        ConfigNode::Mapping(map) => {
            let name = head
                .as_key()
                .ok_or_else(|| invalid_key(key, "empty key segment"))?;
            Ok(map.entry(name).or_insert(fresh))
        }
        ConfigNode::Sequence(items) => {
            let Segment::Index(i) = head else {
                return Err(list_format(key, head));
            };
            let i = *i;
            if i > items.len() {
                return Err(ConftreeError::ListOrderViolation {
                    key: key.to_string(),
                    expected: items.len(),
                    found: i,
                });
            }
            if i == items.len() {
                items.push(fresh);
            }
            Ok(&mut items[i])
        }
        _ => Err(invalid_key(key, "descends through a value set by another key")),
    }
}

fn holds_sequence(focus: &ConfigNode, head: &Segment) -> bool {
    let child = match (focus, head) {
        (ConfigNode::Mapping(map), head) => head.as_key().and_then(|k| map.get(&k)),
        (ConfigNode::Sequence(items), Segment::Index(i)) => items.get(*i),
        _ => None,
    };
    matches!(child, Some(ConfigNode::Sequence(_)))
}

fn invalid_key(key: &str, reason: &str) -> ConftreeError {
    ConftreeError::InvalidFlatKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn list_format(key: &str, segment: &Segment) -> ConftreeError {
    ConftreeError::ListFormatViolation {
        key: key.to_string(),
        segment: segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn yaml(text: &str) -> ConfigNode {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn simple_key() {
        let node = unflatten("P", vars(&[("P_TEST", "1")])).unwrap();
        assert_eq!(node, yaml("test: '1'"));
    }

    #[test]
    fn prefix_ending_with_separator_is_not_doubled() {
        let node = unflatten("P_", vars(&[("P_TEST", "1")])).unwrap();
        assert_eq!(node, yaml("test: '1'"));
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let node = unflatten("", vars(&[("TEST", "1")])).unwrap();
        assert_eq!(node, yaml("test: '1'"));
    }

    #[test]
    fn prefix_is_case_insensitive() {
        let node = unflatten("myapp", vars(&[("MYAPP_HOST", "0.0.0.0")])).unwrap();
        assert_eq!(node.get("host").and_then(ConfigNode::as_str), Some("0.0.0.0"));
    }

    #[test]
    fn no_matching_prefix_ignored() {
        let node = unflatten("MYAPP", vars(&[("OTHER_HOST", "x"), ("MYAPP", "y")])).unwrap();
        assert_eq!(node, ConfigNode::mapping());
    }

    #[test]
    fn similar_names_stay_apart() {
        let node = unflatten("P", vars(&[("P_TEST", "1"), ("P_TESTA", "2")])).unwrap();
        assert_eq!(node, yaml("{test: '1', testa: '2'}"));
    }

    #[test]
    fn doubled_separator_nests_objects() {
        let node = unflatten(
            "P",
            vars(&[
                ("P_TEST__A__B", "1"),
                ("P_TEST__A__C", "2"),
                ("P_TEST__D", "3"),
                ("P_TEST__E_0", "4"),
            ]),
        )
        .unwrap();
        assert_eq!(
            node,
            yaml("test: {a: {b: '1', c: '2'}, d: '3', e: ['4']}")
        );
    }

    #[test]
    fn lists_and_nested_lists() {
        let node = unflatten(
            "P",
            vars(&[
                ("P_A_0", "1"),
                ("P_B_0_0", "2"),
                ("P_C_0_0__C", "3"),
                ("P_A_1", "4"),
            ]),
        )
        .unwrap();
        assert_eq!(node, yaml("{a: ['1', '4'], b: [['2']], c: [[{c: '3'}]]}"));
    }

    #[test]
    fn list_indexes_sort_numerically() {
        let pairs: Vec<(String, String)> = (0..12)
            .map(|i| (format!("P_A_{i}"), i.to_string()))
            .collect();
        let node = unflatten("P", pairs).unwrap();
        let items = node.get("a").and_then(ConfigNode::as_sequence).unwrap();
        assert_eq!(items.len(), 12);
        assert_eq!(items[10].as_str(), Some("10"));
    }

    #[test]
    fn list_gap_is_order_violation() {
        for pairs in [
            vars(&[("P_A_0", "1"), ("P_A_2", "2")]),
            vars(&[("P_B_0_0", "1"), ("P_B_0_2", "2")]),
            vars(&[("P_A__B_0", "1"), ("P_A__B_2", "2")]),
        ] {
            let err = unflatten("P", pairs).unwrap_err();
            assert!(
                matches!(err, ConftreeError::ListOrderViolation { expected: 1, found: 2, .. }),
                "got {err:?}"
            );
        }
    }

    #[test]
    fn list_of_objects() {
        let node = unflatten(
            "P",
            vars(&[
                ("P_A_0__A", "1"),
                ("P_A_0__B", "2"),
                ("P_A_1__A", "3"),
                ("P_A_1__B", "4"),
            ]),
        )
        .unwrap();
        assert_eq!(node, yaml("a: [{a: '1', b: '2'}, {a: '3', b: '4'}]"));
    }

    #[test]
    fn list_element_without_boundary_is_format_violation() {
        let err = unflatten("P", vars(&[("P_A_0_A", "1"), ("P_A_1_A", "2")])).unwrap_err();
        match err {
            ConftreeError::ListFormatViolation { key, segment } => {
                assert_eq!(key, "P_A_0_A");
                assert_eq!(segment, "0_a");
            }
            other => panic!("Expected ListFormatViolation, got: {other:?}"),
        }
    }

    #[test]
    fn numbers_inside_names_become_compound_keys() {
        let node = unflatten(
            "",
            vars(&[("A", "1"), ("A_80", "2"), ("A_80_B", "3"), ("A_80_B_1", "4")]),
        )
        .unwrap();
        assert_eq!(
            node,
            yaml("{a: '1', a_80: '2', a_80_b: '3', a_80_b_1: '4'}")
        );
    }

    #[test]
    fn compound_key_before_boundary() {
        let node = unflatten("P", vars(&[("P_A_A__B", "1"), ("P_A_A__B_B", "2")])).unwrap();
        assert_eq!(node, yaml("a_a: {b: '1', b_b: '2'}"));
    }

    #[test]
    fn trailing_separator_parses_blob() {
        let node = unflatten(
            "P",
            vars(&[
                ("P_A_", "{ name: Test }"),
                ("P_B_", "d: 1\nc: 2"),
                ("P_C", "{ name: Test }"),
            ]),
        )
        .unwrap();
        assert_eq!(
            node,
            yaml("{a: {name: Test}, b: {d: 1, c: 2}, c: '{ name: Test }'}")
        );
    }

    #[test]
    fn bad_blob_names_the_key() {
        let err = unflatten("P", vars(&[("P_A_0_", "just text")])).unwrap_err();
        match err {
            ConftreeError::NestedBlobParseFailure { key, .. } => assert_eq!(key, "P_A_0_"),
            other => panic!("Expected NestedBlobParseFailure, got: {other:?}"),
        }

        let err = unflatten("P", vars(&[("P_A_", "a: [")])).unwrap_err();
        assert!(matches!(err, ConftreeError::NestedBlobParseFailure { .. }));
    }

    #[test]
    fn descending_through_a_scalar_is_invalid() {
        let err = unflatten("P", vars(&[("P_A", "x"), ("P_A__B", "y")])).unwrap_err();
        assert!(matches!(err, ConftreeError::InvalidFlatKey { .. }), "got {err:?}");
    }

    #[test]
    fn indexes_apply_before_nested_keys() {
        let err = unflatten("P", vars(&[("P_A__B", "y"), ("P_A_0", "x")])).unwrap_err();
        match err {
            ConftreeError::ListFormatViolation { key, segment } => {
                assert_eq!(key, "P_A__B");
                assert_eq!(segment, "b");
            }
            other => panic!("Expected ListFormatViolation, got: {other:?}"),
        }
    }

    #[test]
    fn overly_deep_key_is_rejected() {
        let key = format!("P_{}X", "A__".repeat(5_000));
        let err = unflatten("P", vec![(key, "1".to_string())]).unwrap_err();
        match err {
            ConftreeError::InvalidFlatKey { reason, .. } => {
                assert!(reason.contains("deeper than"), "got {reason}");
            }
            other => panic!("Expected InvalidFlatKey, got: {other:?}"),
        }
    }

    #[test]
    fn key_at_depth_limit_is_accepted() {
        let key = format!("P{}", "_A".repeat(MAX_DEPTH));
        let node = unflatten("P", vec![(key, "1".to_string())]).unwrap();
        let expected = format!("a{}", "_a".repeat(MAX_DEPTH - 1));
        assert_eq!(node.get(&expected).and_then(ConfigNode::as_str), Some("1"));
    }

    #[test]
    fn path_ending_on_boundary_is_invalid() {
        let err = unflatten("P", vars(&[("P_A___", "{x: 1}")])).unwrap_err();
        assert!(matches!(err, ConftreeError::InvalidFlatKey { .. }), "got {err:?}");
    }

    #[test]
    fn custom_separator() {
        let node = Unflattener::new()
            .separator('.')
            .unflatten("app", vars(&[("app.db..url", "pg://"), ("app.hosts.0", "a")]))
            .unwrap();
        assert_eq!(node, yaml("{db: {url: 'pg://'}, hosts: [a]}"));
    }

    #[test]
    fn json_blobs() {
        let node = Unflattener::new()
            .blob_format(Format::Json)
            .unflatten("P", vars(&[("P_A_", r#"{"x": [1, 2]}"#)]))
            .unwrap();
        assert_eq!(node, yaml("a: {x: [1, 2]}"));
    }
}
