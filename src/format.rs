//! Text parsers and renderers for [`Format`].
//!
//! TOML, JSON and YAML go through their serde crates. HOCON is parsed with the
//! `hocon` crate and rendered by hand. Java-style properties are output-only.

use std::fmt::Write as _;

use crate::decode::MAX_DEPTH;
use crate::error::ConftreeError;
use crate::flatten::Flattener;
use crate::node::{ConfigNode, Scalar};
use crate::types::Format;

impl Format {
    /// Parse `text` into a tree.
    ///
    /// Failures are reported as [`ConftreeError::Syntax`] with a 1-based line
    /// and column plus the offending line.
    pub fn parse(self, text: &str) -> Result<ConfigNode, ConftreeError> {
        match self {
            Format::Toml => text
                .parse::<toml::Table>()
                .map(|table| from_toml(toml::Value::Table(table)))
                .map_err(|e| {
                    let (line, column) = e
                        .span()
                        .map(|span| position_of(text, span.start))
                        .unwrap_or((1, 1));
                    syntax(self, text, line, column, e.message())
                }),
            Format::Json => serde_json::from_str(text)
                .map_err(|e| syntax(self, text, e.line(), e.column(), &e.to_string())),
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| {
                let (line, column) = e
                    .location()
                    .map(|loc| (loc.line(), loc.column()))
                    .unwrap_or((1, 1));
                syntax(self, text, line, column, &e.to_string())
            }),
            Format::Hocon => hocon::HoconLoader::new()
                .load_str(text)
                .and_then(|loader| loader.hocon())
                .map_err(|e| hocon_error(text, &e.to_string()))
                .and_then(|doc| from_hocon(doc, text, 0)),
            Format::Properties => Err(syntax(
                self,
                text,
                1,
                1,
                &format!("{self} input is not supported, only rendering"),
            )),
        }
    }

    /// Render `node` as text in this format.
    pub fn render(self, node: &ConfigNode) -> Result<String, ConftreeError> {
        let failed = |reason: String| ConftreeError::Render {
            format: self,
            reason,
        };
        match self {
            Format::Toml => {
                if !matches!(node, ConfigNode::Mapping(_)) {
                    return Err(failed(format!("top level must be a mapping, got {}", node.kind())));
                }
                toml::to_string_pretty(&without_nulls(node)).map_err(|e| failed(e.to_string()))
            }
            Format::Json => serde_json::to_string_pretty(node).map_err(|e| failed(e.to_string())),
            Format::Yaml => serde_yaml::to_string(node).map_err(|e| failed(e.to_string())),
            Format::Hocon => Ok(render_hocon(node)),
            Format::Properties => render_properties(node).map_err(failed),
        }
    }
}

fn from_toml(value: toml::Value) -> ConfigNode {
    match value {
        toml::Value::String(s) => ConfigNode::from(s),
        toml::Value::Integer(i) => ConfigNode::from(i),
        toml::Value::Float(x) => ConfigNode::from(x),
        toml::Value::Boolean(b) => ConfigNode::from(b),
        toml::Value::Datetime(dt) => ConfigNode::from(dt.to_string()),
        toml::Value::Array(items) => ConfigNode::Sequence(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => ConfigNode::Mapping(
            table.into_iter().map(|(k, v)| (k, from_toml(v))).collect(),
        ),
    }
}

fn from_hocon(doc: hocon::Hocon, text: &str, depth: usize) -> Result<ConfigNode, ConftreeError> {
    if depth > MAX_DEPTH {
        return Err(hocon_error(text, &format!("nesting exceeds {MAX_DEPTH} levels")));
    }
    Ok(match doc {
        hocon::Hocon::Null => ConfigNode::Null,
        hocon::Hocon::Boolean(b) => ConfigNode::from(b),
        hocon::Hocon::Integer(i) => ConfigNode::from(i),
        hocon::Hocon::Real(x) => ConfigNode::from(x),
        hocon::Hocon::String(s) => ConfigNode::from(s),
        hocon::Hocon::Array(items) => ConfigNode::Sequence(
            items
                .into_iter()
                .map(|item| from_hocon(item, text, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        hocon::Hocon::Hash(map) => ConfigNode::Mapping(
            map.into_iter()
                .map(|(k, v)| Ok((k, from_hocon(v, text, depth + 1)?)))
                .collect::<Result<_, ConftreeError>>()?,
        ),
        hocon::Hocon::BadValue(e) => return Err(hocon_error(text, &e.to_string())),
    })
}

// The hocon crate reports no position; line 0 marks it as unknown.
fn hocon_error(text: &str, message: &str) -> ConftreeError {
    syntax(Format::Hocon, text, 0, 0, message)
}

/// 1-based `(line, column)` of a byte offset.
fn position_of(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

fn syntax(format: Format, text: &str, line: usize, column: usize, message: &str) -> ConftreeError {
    let line_text = match line {
        0 => String::new(),
        n => text.lines().nth(n - 1).unwrap_or_default().to_string(),
    };
    ConftreeError::Syntax {
        format,
        line,
        column,
        line_text,
        message: message.to_string(),
    }
}

// TOML has no null.
fn without_nulls(node: &ConfigNode) -> ConfigNode {
    match node {
        ConfigNode::Mapping(map) => ConfigNode::Mapping(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        ConfigNode::Sequence(items) => ConfigNode::Sequence(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(without_nulls)
                .collect(),
        ),
        other => other.clone(),
    }
}

// --- HOCON ---

fn render_hocon(node: &ConfigNode) -> String {
    let mut out = String::new();
    match node {
        ConfigNode::Mapping(map) => {
            for (k, v) in map {
                write_hocon_member(&mut out, k, v, 0);
            }
        }
        other => {
            write_hocon_value(&mut out, other, 0);
            out.push('\n');
        }
    }
    out
}

fn write_hocon_member(out: &mut String, key: &str, value: &ConfigNode, indent: usize) {
    let pad = "  ".repeat(indent);
    let key = hocon_key(key);
    match value {
        ConfigNode::Mapping(map) if !map.is_empty() => {
            let _ = writeln!(out, "{pad}{key} {{");
            for (k, v) in map {
                write_hocon_member(out, k, v, indent + 1);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        other => {
            let _ = write!(out, "{pad}{key} = ");
            write_hocon_value(out, other, indent);
            out.push('\n');
        }
    }
}

fn write_hocon_value(out: &mut String, value: &ConfigNode, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        ConfigNode::Null => out.push_str("null"),
        ConfigNode::Scalar(Scalar::Str(s)) => out.push_str(&quoted(s)),
        ConfigNode::Scalar(other) => {
            let _ = write!(out, "{other}");
        }
        ConfigNode::Sequence(items) if items.is_empty() => out.push_str("[]"),
        ConfigNode::Sequence(items) => {
            out.push_str("[\n");
            for item in items {
                let _ = write!(out, "{pad}  ");
                write_hocon_value(out, item, indent + 1);
                out.push('\n');
            }
            let _ = write!(out, "{pad}]");
        }
        ConfigNode::Mapping(map) if map.is_empty() => out.push_str("{}"),
        ConfigNode::Mapping(map) => {
            out.push_str("{\n");
            for (k, v) in map {
                write_hocon_member(out, k, v, indent + 1);
            }
            let _ = write!(out, "{pad}}}");
        }
    }
}

fn hocon_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare { key.to_string() } else { quoted(key) }
}

fn quoted(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

// --- properties ---

fn render_properties(node: &ConfigNode) -> Result<String, String> {
    let pairs = Flattener::dotted()
        .flatten_raw("", node)
        .map_err(|e| e.0)?;
    let mut out = String::new();
    for (key, value) in pairs {
        let _ = writeln!(out, "{} = {}", escape_property(&key, true), escape_property(&value, false));
    }
    Ok(out)
}

fn escape_property(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' ' | '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
