use std::path::Path;

use crate::error::Error;
use crate::scanner::TagAlias;

/// Crate configuration loaded from `wikiref.toml` by the embedding host.
/// Controls which tag aliases are scanned and how large a content block the
/// scanner will touch.
#[derive(Debug, Clone)]
pub struct Config {
    aliases: Vec<TagAlias>,
    max_scan_bytes: Option<u64>,
}

/// Raw TOML structure for `wikiref.toml`.
#[derive(serde::Deserialize)]
struct WikirefTomlConfig {
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    max_scan_bytes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::scan_everything_by_default()
    }
}

impl Config {
    /// Load config from `wikiref.toml` in the given root directory.
    /// Returns a default that scans all four aliases with no size limit if
    /// the file doesn't exist. Returns an error if the file exists but is
    /// malformed — never silently falls back to defaults when the host
    /// wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or `Error::InvalidOption`
    /// if an alias name is not one of the four recognized tags.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join("wikiref.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::scan_everything_by_default());
            },
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: WikirefTomlConfig = toml::from_str(&content)?;
        let aliases = match raw.aliases {
            None => TagAlias::ALL.to_vec(),
            Some(names) => parse_aliases(&names)?,
        };

        Ok(Self { aliases, max_scan_bytes: raw.max_scan_bytes })
    }

    /// Default config: all four aliases, no scan size limit.
    fn scan_everything_by_default() -> Self {
        Self { aliases: TagAlias::ALL.to_vec(), max_scan_bytes: None }
    }

    /// The aliases the scanner should recognize.
    pub fn aliases(&self) -> &[TagAlias] {
        &self.aliases
    }

    /// Optional cap on scanned content size, in bytes.
    pub fn max_scan_bytes(&self) -> Option<u64> {
        self.max_scan_bytes
    }
}

/// Resolve configured alias names, rejecting unknown ones up front.
fn parse_aliases(names: &[String]) -> Result<Vec<TagAlias>, Error> {
    let mut aliases = Vec::with_capacity(names.len());
    for name in names {
        let alias = TagAlias::parse(name).ok_or_else(|| Error::InvalidOption {
            reason: format!("unknown tag alias `{name}` in config"),
        })?;
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }
    Ok(aliases)
}
