//! `--key value` command-line arguments as flat pairs.
//!
//! Flags use dashes where environment variables use underscores: `--db--url`
//! is the flat key `db__url`, `--hosts-0` is `hosts_0`, and a trailing dash
//! (`--db-`) marks a configuration blob. The pairs are meant for
//! [`unflatten`](crate::unflatten()) with an empty prefix.

use crate::error::ConftreeError;

/// Pair up `--flag value` arguments.
///
/// A leading argument that is not a flag is taken as the program name and
/// skipped. Every other argument must alternate flag, value.
pub fn args_to_pairs<I, S>(argv: I) -> Result<Vec<(String, String)>, ConftreeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = argv.into_iter().map(Into::into).peekable();
    if args.peek().is_some_and(|first| !first.starts_with("--")) {
        args.next();
    }

    let mut pairs = Vec::new();
    while let Some(flag) = args.next() {
        let Some(name) = flag.strip_prefix("--") else {
            return Err(ConftreeError::InvalidFlatKey {
                key: flag.clone(),
                reason: "cli argument is misplaced, expected a --flag".into(),
            });
        };
        let Some(value) = args.next() else {
            return Err(ConftreeError::InvalidFlatKey {
                key: flag.clone(),
                reason: "last argument is missing its value".into(),
            });
        };
        pairs.push((name.replace('-', "_"), value));
    }
    Ok(pairs)
}
