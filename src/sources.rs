//! Layered configuration sources and their resolution.
//!
//! [`Sources`] is an immutable, persistent list of trees. Every `with_*` call
//! returns a new value that shares all earlier layers, so a common base can be
//! extended in several directions without copying:
//!
//! ```ignore
//! let base = Sources::new().with_file("app.toml")?;
//! let prod = base.with_file("prod.toml")?.with_process_env("APP")?;
//! let test = base.with_text("port: 0", Format::Yaml)?;
//! ```
//!
//! Resolution is a fixed pipeline:
//!
//! 1. Fold the layers oldest first with [`deep_merge`] (later layers win)
//! 2. Decode the merged tree against the schema
//! 3. Optionally convert the decoded value into a [`Shape`] type
//!
//! Environment and argv layers only carry text, so adding one turns strict
//! scalar checking off for the whole resolution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::argv;
use crate::decode::Decoder;
use crate::error::ConftreeError;
use crate::flatten;
use crate::merge::deep_merge;
use crate::node::ConfigNode;
use crate::schema::TypeDescriptor;
use crate::shape::Shape;
use crate::types::Format;
use crate::unflatten::unflatten;
use crate::value::Value;

/// Where a layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Node,
    Text(Format),
    File(PathBuf),
    Env(String),
    Args,
    Overrides,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Node => write!(f, "tree"),
            Origin::Text(format) => write!(f, "{format} text"),
            Origin::File(path) => write!(f, "file {}", path.display()),
            Origin::Env(prefix) => write!(f, "environment ({prefix})"),
            Origin::Args => write!(f, "command line"),
            Origin::Overrides => write!(f, "overrides"),
        }
    }
}

#[derive(Debug)]
struct Layer {
    origin: Origin,
    node: ConfigNode,
    below: Option<Arc<Layer>>,
}

#[derive(Debug, Clone)]
pub struct Sources {
    top: Option<Arc<Layer>>,
    strict: bool,
    ignore_unexpected: bool,
}

impl Default for Sources {
    fn default() -> Self {
        Self::new()
    }
}

impl Sources {
    /// No layers, strict scalars, unexpected keys rejected.
    pub fn new() -> Self {
        Self {
            top: None,
            strict: true,
            ignore_unexpected: false,
        }
    }

    fn push(&self, origin: Origin, node: ConfigNode) -> Self {
        debug!(origin = %origin, "adding configuration layer");
        Self {
            top: Some(Arc::new(Layer {
                origin,
                node,
                below: self.top.clone(),
            })),
            ..self.clone()
        }
    }

    /// Add an already built tree.
    pub fn with_node(&self, node: ConfigNode) -> Self {
        self.push(Origin::Node, node)
    }

    /// Parse `text` and add it.
    pub fn with_text(&self, text: &str, format: Format) -> Result<Self, ConftreeError> {
        let node = format.parse(text)?;
        Ok(self.push(Origin::Text(format), node))
    }

    /// Read and parse a file, picking the format from its extension.
    pub fn with_file(&self, path: impl AsRef<Path>) -> Result<Self, ConftreeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConftreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let node = Format::from_path(path).parse(&text)?;
        Ok(self.push(Origin::File(path.to_path_buf()), node))
    }

    /// Add variables matching `prefix`, unflattened. Turns strict mode off.
    pub fn with_env(
        &self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConftreeError> {
        let node = unflatten(prefix, vars)?;
        Ok(self.push(Origin::Env(prefix.to_string()), node).strict(false))
    }

    /// [`with_env`](Self::with_env) over the current process environment.
    pub fn with_process_env(&self, prefix: &str) -> Result<Self, ConftreeError> {
        self.with_env(prefix, std::env::vars())
    }

    /// Add `--key value` arguments. Turns strict mode off.
    pub fn with_args<I, S>(&self, argv: I) -> Result<Self, ConftreeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = unflatten("", argv::args_to_pairs(argv)?)?;
        Ok(self.push(Origin::Args, node).strict(false))
    }

    /// Add any serializable value as a layer, skipping `None` fields.
    ///
    /// Meant for clap-derived structs whose optional flags should only
    /// override when given. Values go through their text form, so this also
    /// turns strict mode off.
    pub fn with_overrides<S: Serialize + ?Sized>(&self, source: &S) -> Result<Self, ConftreeError> {
        let pairs = flatten::flatten("", source)?;
        let node = unflatten("", pairs)?;
        Ok(self.push(Origin::Overrides, node).strict(false))
    }

    /// Require scalars to already have the right kind (default `true`).
    pub fn strict(&self, strict: bool) -> Self {
        Self {
            strict,
            ..self.clone()
        }
    }

    /// Tolerate keys no record field consumes (default `false`).
    pub fn ignore_unexpected(&self, ignore: bool) -> Self {
        Self {
            ignore_unexpected: ignore,
            ..self.clone()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Layer origins, oldest first.
    pub fn origins(&self) -> Vec<&Origin> {
        let mut out: Vec<&Origin> = self.layers().map(|l| &l.origin).collect();
        out.reverse();
        out
    }

    pub fn len(&self) -> usize {
        self.layers().count()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    fn layers(&self) -> impl Iterator<Item = &Layer> {
        std::iter::successors(self.top.as_deref(), |layer| layer.below.as_deref())
    }

    /// All layers deep-merged, oldest first. Empty sources give an empty mapping.
    pub fn merged(&self) -> ConfigNode {
        let mut nodes: Vec<&ConfigNode> = self.layers().map(|l| &l.node).collect();
        nodes.reverse();
        debug!(layers = nodes.len(), "merging configuration layers");
        nodes
            .into_iter()
            .fold(ConfigNode::mapping(), |acc, node| deep_merge(acc, node.clone()))
    }

    fn decoder(&self) -> Decoder {
        Decoder::new()
            .strict(self.strict)
            .ignore_unexpected(self.ignore_unexpected)
    }

    /// Merge and decode against `schema`.
    pub fn resolve(&self, schema: &TypeDescriptor) -> Result<Value, ConftreeError> {
        self.decoder().decode(&self.merged(), schema)
    }

    /// Merge and decode into `T`.
    pub fn resolve_as<T: Shape>(&self) -> Result<T, ConftreeError> {
        T::from_node_with(&self.decoder(), &self.merged())
    }
}
