use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A textual configuration format.
///
/// Every format can be rendered. `Properties` is output-only; parsing it
/// returns a syntax error pointing at line 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Toml,
    Json,
    Yaml,
    Hocon,
    Properties,
}

impl Format {
    /// Pick a format from a file extension. Unknown or missing extensions
    /// fall back to TOML, and so does `.properties` since it cannot be read.
    pub fn from_path(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Format::Yaml,
            Some("json") => Format::Json,
            Some("conf" | "hocon") => Format::Hocon,
            _ => Format::Toml,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Toml => "TOML",
            Format::Json => "JSON",
            Format::Yaml => "YAML",
            Format::Hocon => "HOCON",
            Format::Properties => "properties",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "hocon" | "conf" => Ok(Format::Hocon),
            "properties" => Ok(Format::Properties),
            other => Err(format!(
                "unknown format '{other}' (expected toml, json, yaml, hocon or properties)"
            )),
        }
    }
}
