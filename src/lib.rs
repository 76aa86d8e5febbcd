//! Type-directed decoding of layered configuration trees.
//!
//! Conftree turns loosely typed configuration (files, environment variables,
//! command-line flags, in-memory defaults) into checked, strongly typed
//! values. You describe the target shape once as a [`TypeDescriptor`], stack
//! your sources, and resolve:
//!
//! ```ignore
//! let config: AppConfig = Sources::new()
//!     .with_file("app.toml")?
//!     .with_process_env("APP")?
//!     .with_args(std::env::args())?
//!     .resolve_as()?;
//! ```
//!
//! Every failure names the offending location in the tree (`<root>.db.port`)
//! and what was expected there.
//!
//! # The pipeline
//!
//! ```text
//! text / env / argv ──parse──▶ ConfigNode ──merge──▶ ConfigNode ──decode──▶ Value ──▶ Shape
//!                                                        ▲                    │
//!                                                        └──────encode────────┘
//! ```
//!
//! - [`ConfigNode`] is the generic tree: null, scalar, sequence or string-keyed
//!   mapping. Text formats parse into it ([`Format::parse`]) and render
//!   from it ([`Format::render`]).
//! - [`deep_merge`] folds trees: two mappings merge key by key, anything else
//!   is replaced wholesale by the later tree.
//! - [`decode`] walks a tree against a [`TypeDescriptor`] and produces a
//!   [`Value`], the dynamic typed result. [`encode`] is its inverse.
//! - [`Shape`] ties a Rust type to its descriptor and to `Value`, so
//!   [`Sources::resolve_as`] can hand back your own struct.
//!
//! # Schemas
//!
//! Descriptors are plain data built with constructors, no reflection or
//! macros involved:
//!
//! ```ignore
//! let server: TypeDescriptor = RecordDescriptor::new("Server")
//!     .field(Field::new("host", TypeDescriptor::string()).default("localhost"))
//!     .with("port", TypeDescriptor::int())
//!     .with("tags", TypeDescriptor::list(TypeDescriptor::string()))
//!     .into();
//! ```
//!
//! Records, lists, tuples, string-keyed maps, optionals, unions (first match
//! wins), enums, literals and scalars (bool, int, float, str, path, ISO-8601
//! datetime and duration) are supported. A record field `max_connections`
//! also matches the key `max-connections`.
//!
//! ## Polymorphic records
//!
//! A [`TypeDescriptor::Polymorphic`] lists the record variants a value may
//! take. Every variant is tried; exactly one must succeed. When several
//! would, the mapping must carry a `_type` key ([`DISCRIMINANT_KEY`]) naming
//! the variant, either by its bare name or any suffix of its qualified name:
//!
//! ```yaml
//! input:
//!   _type: HttpInput        # or inputs::HttpInput
//!   url: https://example.com
//! ```
//!
//! # Flat sources
//!
//! Environment variables and command-line flags are flat `key = text` pairs.
//! [`unflatten`] rebuilds a tree from them:
//!
//! ```text
//! APP_DB__URL=pg://        db: { url: "pg://" }
//! APP_HOSTS_0=a            hosts: [a, b]
//! APP_HOSTS_1=b
//! APP_LIMITS_={max: 5}     limits: { max: 5 }      (trailing separator: YAML blob)
//! ```
//!
//! A single separator between segments is ambiguous on purpose: `APP_DB_URL`
//! becomes the key `db_url`, matching a record field of that name. Doubling
//! it (`DB__URL`) descends into a nested mapping. Numeric segments index
//! lists and must appear in order from zero. [`flatten`] goes the other way
//! for anything that implements `Serialize`.
//!
//! Command-line flags follow the same grammar with dashes:
//! `--db--url pg:// --hosts-0 a`.
//!
//! # Strict mode
//!
//! Decoding is strict by default: a quoted `"8080"` does not satisfy an
//! integer field. Flat sources carry nothing but text, so adding an
//! environment, argv or overrides layer to [`Sources`] turns coercion on
//! (`"8080"` → 8080, `"yes"` → true). Call [`Sources::strict`] afterwards to
//! force it back.
//!
//! Keys that no record field consumes are an error unless
//! [`Sources::ignore_unexpected`] is set.
//!
//! # Clap adapter
//!
//! With the `clap` feature (on by default), [`SourceArgs`] adds `--config`,
//! `--set` and `--env-prefix` flags to your own parser. To use conftree
//! without clap:
//!
//! ```toml
//! conftree = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`ConftreeError`]. With the `rich-errors`
//! feature it also implements `miette::Diagnostic`. See the [`error`] module
//! for the full set.

pub mod error;
pub mod types;

mod argv;
#[cfg(feature = "clap")]
mod cli;
mod decode;
mod encode;
mod flatten;
mod format;
mod iso8601;
mod merge;
mod node;
mod schema;
mod shape;
mod sources;
mod unflatten;
mod value;

#[cfg(test)]
mod fixtures;

pub use argv::args_to_pairs;
#[cfg(feature = "clap")]
pub use cli::SourceArgs;
pub use decode::{DISCRIMINANT_KEY, Decoder, MAX_DEPTH, decode};
pub use encode::encode;
pub use error::ConftreeError;
pub use flatten::{Flattener, flatten};
pub use merge::deep_merge;
pub use node::{ConfigNode, Scalar};
pub use schema::{
    EnumDescriptor, EnumMember, Field, FieldDefault, RecordDescriptor, ScalarKind, TypeDescriptor,
};
pub use shape::{Shape, expect_enum, expect_record};
pub use sources::{Origin, Sources};
pub use types::Format;
pub use unflatten::{Unflattener, unflatten};
pub use value::{EnumValue, Record, Value};
