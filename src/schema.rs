//! Static descriptions of the shapes a configuration tree can be decoded into.
//!
//! A [`TypeDescriptor`] is built once per target type (by hand, or through the
//! [`Shape`](crate::Shape) trait) and reused for every decode. Nothing here is
//! discovered at runtime: record fields, enum members and polymorphic variants
//! are all listed explicitly by the schema author.

use std::fmt;

use crate::node::{ConfigNode, Scalar};

/// The leaf kinds the decoder knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    String,
    Path,
    DateTime,
    Duration,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "str",
            ScalarKind::Path => "path",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Duration => "duration",
        };
        f.write_str(name)
    }
}

/// How a record field is filled when the input does not mention it.
#[derive(Debug, Clone, Default)]
pub enum FieldDefault {
    #[default]
    None,
    /// A fixed node, decoded through the field's descriptor like any input.
    Node(ConfigNode),
    /// Called once per decode that needs it.
    Factory(fn() -> ConfigNode),
}

impl FieldDefault {
    pub(crate) fn produce(&self) -> Option<ConfigNode> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Node(node) => Some(node.clone()),
            FieldDefault::Factory(f) => Some(f()),
        }
    }
}

/// One declared field of a record.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
    pub default: FieldDefault,
}

impl Field {
    pub fn new(name: &str, ty: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: FieldDefault::None,
        }
    }

    /// Use `node` when the key is absent.
    pub fn default(mut self, node: impl Into<ConfigNode>) -> Self {
        self.default = FieldDefault::Node(node.into());
        self
    }

    /// Call `factory` when the key is absent.
    pub fn default_with(mut self, factory: fn() -> ConfigNode) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    /// The one alternate spelling accepted in input: underscores as hyphens.
    pub(crate) fn dash_alias(&self) -> Option<String> {
        self.name
            .contains('_')
            .then(|| self.name.replace('_', "-"))
    }
}

/// A closed set of named fields.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    pub name: String,
    /// Module-like path qualifying `name`, e.g. `"app::inputs"`.
    pub path: Option<String>,
    pub fields: Vec<Field>,
}

impl RecordDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            fields: Vec::new(),
        }
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Shorthand for a field without a default.
    pub fn with(self, name: &str, ty: TypeDescriptor) -> Self {
        self.field(Field::new(name, ty))
    }

    /// `path::name`, the string a `_type` discriminant is matched against.
    pub fn qualified_name(&self) -> String {
        match &self.path {
            Some(p) => format!("{p}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// One member of an enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub ordinal: i64,
    /// Backing string, for string-backed enums.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub string_backed: bool,
}

impl EnumDescriptor {
    /// Members named in order, ordinals counting from 1.
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            members: members
                .iter()
                .zip(1..)
                .map(|(m, ordinal)| EnumMember {
                    name: m.to_string(),
                    ordinal,
                    value: None,
                })
                .collect(),
            string_backed: false,
        }
    }

    /// Members with explicit `(name, ordinal)` pairs.
    pub fn with_ordinals(name: &str, members: &[(&str, i64)]) -> Self {
        Self {
            name: name.to_string(),
            members: members
                .iter()
                .map(|(m, ordinal)| EnumMember {
                    name: m.to_string(),
                    ordinal: *ordinal,
                    value: None,
                })
                .collect(),
            string_backed: false,
        }
    }

    /// Members with `(name, backing string)` pairs, ordinals counting from 1.
    pub fn string_backed(name: &str, members: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            members: members
                .iter()
                .zip(1..)
                .map(|((m, v), ordinal)| EnumMember {
                    name: m.to_string(),
                    ordinal,
                    value: Some(v.to_string()),
                })
                .collect(),
            string_backed: true,
        }
    }

    pub(crate) fn by_ordinal(&self, ordinal: i64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.ordinal == ordinal)
    }

    pub(crate) fn by_text(&self, text: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == text).or_else(|| {
            if self.string_backed {
                self.members
                    .iter()
                    .find(|m| m.value.as_deref() == Some(text))
            } else {
                None
            }
        })
    }
}

/// The expected shape of a configuration subtree.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Record(RecordDescriptor),
    /// `elem: None` stands for a list declared without element type.
    List { elem: Option<Box<TypeDescriptor>> },
    /// With `variadic`, `elems` holds the single repeated element type.
    Tuple {
        elems: Vec<TypeDescriptor>,
        variadic: bool,
    },
    /// Keys are passed through unchecked; `value: None` lacks type information.
    Mapping {
        key: Option<Box<TypeDescriptor>>,
        value: Option<Box<TypeDescriptor>>,
    },
    Optional(Box<TypeDescriptor>),
    /// Alternatives tried in declaration order.
    Union(Vec<TypeDescriptor>),
    Enum(EnumDescriptor),
    Literal(Vec<Scalar>),
    Scalar(ScalarKind),
    /// A base name and its closed set of concrete variants.
    Polymorphic {
        base: String,
        variants: Vec<RecordDescriptor>,
    },
    /// Anything at all, decoded structurally.
    Opaque,
}

impl TypeDescriptor {
    pub fn bool() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Bool)
    }

    pub fn int() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Int)
    }

    pub fn float() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Float)
    }

    pub fn string() -> Self {
        TypeDescriptor::Scalar(ScalarKind::String)
    }

    pub fn path() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Path)
    }

    pub fn datetime() -> Self {
        TypeDescriptor::Scalar(ScalarKind::DateTime)
    }

    pub fn duration() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Duration)
    }

    pub fn list(elem: TypeDescriptor) -> Self {
        TypeDescriptor::List {
            elem: Some(Box::new(elem)),
        }
    }

    pub fn tuple(elems: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Tuple {
            elems,
            variadic: false,
        }
    }

    /// A tuple of any length whose elements all share `elem`.
    pub fn variadic_tuple(elem: TypeDescriptor) -> Self {
        TypeDescriptor::Tuple {
            elems: vec![elem],
            variadic: true,
        }
    }

    /// A string-keyed mapping.
    pub fn map(value: TypeDescriptor) -> Self {
        TypeDescriptor::Mapping {
            key: Some(Box::new(TypeDescriptor::string())),
            value: Some(Box::new(value)),
        }
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn union(branches: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Union(branches)
    }

    pub fn literal<I: IntoIterator<Item = Scalar>>(allowed: I) -> Self {
        TypeDescriptor::Literal(allowed.into_iter().collect())
    }

    pub fn polymorphic(base: &str, variants: Vec<RecordDescriptor>) -> Self {
        TypeDescriptor::Polymorphic {
            base: base.to_string(),
            variants,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }
}

impl From<RecordDescriptor> for TypeDescriptor {
    fn from(r: RecordDescriptor) -> Self {
        TypeDescriptor::Record(r)
    }
}

impl From<EnumDescriptor> for TypeDescriptor {
    fn from(e: EnumDescriptor) -> Self {
        TypeDescriptor::Enum(e)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_param(f: &mut fmt::Formatter<'_>, param: &Option<Box<TypeDescriptor>>) -> fmt::Result {
    match param {
        Some(p) => write!(f, "{p}"),
        None => write!(f, "?"),
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Record(r) => write!(f, "{}", r.name),
            TypeDescriptor::List { elem } => {
                write!(f, "List[")?;
                write_param(f, elem)?;
                write!(f, "]")
            }
            TypeDescriptor::Tuple { elems, variadic } => {
                write!(f, "Tuple[")?;
                write_joined(f, elems)?;
                if *variadic {
                    write!(f, ", ...")?;
                }
                write!(f, "]")
            }
            TypeDescriptor::Mapping { key, value } => {
                write!(f, "Dict[")?;
                write_param(f, key)?;
                write!(f, ", ")?;
                write_param(f, value)?;
                write!(f, "]")
            }
            TypeDescriptor::Optional(inner) => write!(f, "Optional[{inner}]"),
            TypeDescriptor::Union(branches) => {
                write!(f, "Union[")?;
                write_joined(f, branches)?;
                write!(f, "]")
            }
            TypeDescriptor::Enum(e) => write!(f, "{}", e.name),
            TypeDescriptor::Literal(allowed) => {
                write!(f, "Literal[")?;
                for (i, a) in allowed.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, "]")
            }
            TypeDescriptor::Scalar(kind) => write!(f, "{kind}"),
            TypeDescriptor::Polymorphic { base, .. } => write!(f, "{base}"),
            TypeDescriptor::Opaque => write!(f, "Any"),
        }
    }
}
