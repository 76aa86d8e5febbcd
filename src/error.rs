//! The error type shared by decoding, encoding, unflattening and source loading.
//!
//! Every decode error carries the breadcrumb path where it happened
//! (`<root>.server.ports[]`), so messages can be shown to users as-is.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Format;

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum ConftreeError {
    #[error("expected {expected} at {path}, got {found}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::type_mismatch)))]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("missing type information at {path}: {detail}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(conftree::missing_type_parameter))
    )]
    MissingTypeParameter { path: String, detail: String },

    #[error("malformed configuration at {path}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::malformed)))]
    MalformedStructure { path: String, reason: String },

    #[error("unexpected key(s) \"{}\" detected for type {type_name} at {path}", .keys.join(", "))]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(conftree::unexpected_keys),
            help("remove the keys or decode with ignore_unexpected(true)")
        )
    )]
    UnexpectedKeys {
        path: String,
        type_name: String,
        keys: Vec<String>,
    },

    #[error(
        "multiple variants of {base} matched at {path}, use '_type' to disambiguate:\n- {}",
        .variants.join("\n- ")
    )]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(conftree::ambiguous_variant), help("add a `_type` key naming the variant"))
    )]
    AmbiguousPolymorphicMatch {
        path: String,
        base: String,
        variants: Vec<String>,
    },

    #[error("list index out of order for '{key}': expected index {expected}, got {found}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::list_order)))]
    ListOrderViolation {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("'{key}' addresses a list with non-index segment '{segment}'")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::list_format)))]
    ListFormatViolation { key: String, segment: String },

    #[error("invalid flat key '{key}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::invalid_flat_key)))]
    InvalidFlatKey { key: String, reason: String },

    #[error("'{key}' ends with the separator and expects a nested config: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::nested_blob)))]
    NestedBlobParseFailure {
        key: String,
        source: Box<ConftreeError>,
    },

    #[error("cannot parse value at {path}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::parse)))]
    GenericParseFailure { path: String, reason: String },

    #[error("{format} parsing failure line {line} character {column}, got \"{line_text}\": {message}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::syntax)))]
    Syntax {
        format: Format,
        line: usize,
        column: usize,
        line_text: String,
        message: String,
    },

    #[error("failed to render {format}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::render)))]
    Render { format: Format, reason: String },

    #[error("Failed to read {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(conftree::io)))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConftreeError {
    pub(crate) fn mismatch(path: &str, expected: impl ToString, found: impl ToString) -> Self {
        ConftreeError::TypeMismatch {
            path: display_path(path),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        ConftreeError::MalformedStructure {
            path: display_path(path),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_type(path: &str, detail: impl Into<String>) -> Self {
        ConftreeError::MissingTypeParameter {
            path: display_path(path),
            detail: detail.into(),
        }
    }

    pub(crate) fn parse_failure(path: &str, reason: impl Into<String>) -> Self {
        ConftreeError::GenericParseFailure {
            path: display_path(path),
            reason: reason.into(),
        }
    }

    /// The breadcrumb path, for errors raised while decoding.
    pub fn path(&self) -> Option<&str> {
        match self {
            ConftreeError::TypeMismatch { path, .. }
            | ConftreeError::MissingTypeParameter { path, .. }
            | ConftreeError::MalformedStructure { path, .. }
            | ConftreeError::UnexpectedKeys { path, .. }
            | ConftreeError::AmbiguousPolymorphicMatch { path, .. }
            | ConftreeError::GenericParseFailure { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Paths are built as `.a.b[]`; the root itself is shown as `<root>`.
pub(crate) fn display_path(path: &str) -> String {
    format!("<root>{path}")
}
