//! Clap adapter for conftree.
//!
//! Compiled only with the `clap` Cargo feature (on by default). [`SourceArgs`]
//! is a derive type you flatten into your own `#[derive(Parser)]` struct to
//! get the usual configuration flags:
//!
//! ```text
//! -c, --config <FILE>          configuration file, repeatable, later files win
//!     --set <KEY=VALUE>        single value override, repeatable
//!     --env-prefix <PREFIX>    read PREFIX_* environment variables
//! ```
//!
//! [`SourceArgs::apply`] stacks them onto a base [`Sources`] in that order, so
//! `--set` beats the environment, which beats files. Without clap, build the
//! same layers directly with the `with_*` methods.

use std::path::PathBuf;

use clap::Args;

use crate::argv::args_to_pairs;
use crate::error::ConftreeError;
use crate::sources::Sources;
use crate::unflatten::unflatten;

/// Clap-derived configuration source flags.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     sources: SourceArgs,
/// }
///
/// let cli = Cli::parse();
/// let config: AppConfig = cli.sources.apply(Sources::new())?.resolve_as()?;
/// ```
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Configuration file to load. Format follows the extension.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Vec<PathBuf>,

    /// Override one value, e.g. `--set db--url=pg://` or `--set hosts-0=a`.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Read environment variables starting with this prefix.
    #[arg(long, value_name = "PREFIX")]
    pub env_prefix: Option<String>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

impl SourceArgs {
    /// Stack files, then the process environment, then `--set` values.
    pub fn apply(self, base: Sources) -> Result<Sources, ConftreeError> {
        self.apply_with_vars(base, std::env::vars())
    }

    /// [`apply`](Self::apply) with an explicit variable set.
    pub fn apply_with_vars(
        self,
        base: Sources,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Sources, ConftreeError> {
        let mut sources = base;
        for path in &self.config {
            sources = sources.with_file(path)?;
        }
        if let Some(prefix) = &self.env_prefix {
            sources = sources.with_env(prefix, vars)?;
        }
        if !self.set.is_empty() {
            let argv = self
                .set
                .into_iter()
                .flat_map(|(key, value)| [format!("--{key}"), value]);
            let node = unflatten("", args_to_pairs(argv)?)?;
            sources = sources.with_node(node).strict(false);
        }
        Ok(sources)
    }
}
