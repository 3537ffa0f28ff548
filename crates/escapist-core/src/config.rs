//! Configuration: the builder, the TOML file format, and validation into
//! [`Settings`].
//!
//! Validation never fails. Every problem is reported as a [`ConfigError`]
//! diagnostic and the offending value falls back to its default, so a broken
//! configuration still yields a working detector.
//!
//! # Example
//!
//! ```
//! use escapist_core::config::Config;
//! use escapist_core::action::EscapeAction;
//! use escapist_core::Mode;
//! use std::time::Duration;
//!
//! let config = Config::new()
//!     .with_mappings(["jk", "kj"])
//!     .with_timeout(Duration::from_millis(200))
//!     .with_escape(Mode::Terminal, EscapeAction::Disabled);
//!
//! let (settings, diagnostics) = config.normalize();
//! assert!(diagnostics.is_empty());
//! assert!(settings.table().completes('k', 'j'));
//! ```

use crate::action::{ActionResolver, EscapeAction};
use crate::mode::{Mode, UnknownMode};
use crate::table::CombinationTable;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mappings used when none are configured or none are valid.
pub const DEFAULT_MAPPINGS: [&str; 2] = ["jk", "jj"];

/// Time allowed between the first and second key of a combination.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// A configuration problem found while loading or validating.
///
/// Each diagnostic describes the fallback that was applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("mapping `{0}` must be exactly two characters; ignoring it")]
    InvalidMapping(String),
    #[error("mapping entry `{0}` is not a string; ignoring it")]
    NonStringMapping(String),
    #[error("no valid mappings configured; using the defaults `jk`, `jj`")]
    NoValidMappings,
    #[error("option `{option}` must be {expected}, got `{value}`; using the default")]
    InvalidOption {
        option: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("`{0}` is not a known mode; ignoring its escape action")]
    UnknownMode(String),
    #[error("mode `{0}` does not support escape actions; ignoring it")]
    UnsupportedMode(Mode),
    #[error("escape action for `{mode}` must be a key string or `false`, got `{value}`; using the default")]
    InvalidEscapeValue { mode: String, value: String },
    #[error("unknown option `{0}`; ignoring it")]
    UnknownOption(String),
}

/// Errors that prevent a configuration file from being read at all.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// User configuration, before validation.
///
/// Build one with [`Config::new`] and the `with_*` methods, or load it from
/// TOML with [`Config::from_toml_str`] / [`Config::load`]. Hand it to
/// [`Detector::setup`](crate::Detector::setup), which validates it.
#[derive(Debug, Clone)]
pub struct Config {
    mappings: Vec<String>,
    timeout: Duration,
    suppress_modified: bool,
    escape: Vec<(String, EscapeAction)>,
    // Problems found while parsing a file, reported again at setup.
    carried: Vec<ConfigError>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// The default configuration: `jk` and `jj`, a 1000 ms timeout,
    /// modification suppression on, and the built-in action for every mode.
    pub fn new() -> Self {
        Self {
            mappings: DEFAULT_MAPPINGS.iter().map(|m| m.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            suppress_modified: true,
            escape: Vec::new(),
            carried: Vec::new(),
        }
    }

    /// Replace the mapping list. Each entry should be exactly two characters.
    pub fn with_mappings(mut self, mappings: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.mappings = mappings.into_iter().map(Into::into).collect();
        self
    }

    /// Set the combination timeout. Must be non-zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable modification suppression.
    pub fn with_suppress_modified(mut self, suppress: bool) -> Self {
        self.suppress_modified = suppress;
        self
    }

    /// Set the escape action for `mode`.
    pub fn with_escape(self, mode: Mode, action: EscapeAction) -> Self {
        self.with_escape_named(mode.name(), action)
    }

    /// Set the escape action for a mode given by configuration name
    /// (`"i"`, `"insert"`, `"t"`, ...). Unknown names are reported at setup.
    pub fn with_escape_named(mut self, mode: impl Into<String>, action: EscapeAction) -> Self {
        self.escape.push((mode.into(), action));
        self
    }

    /// Parse a TOML document.
    ///
    /// Only malformed TOML is an error. Values of the wrong type are recorded
    /// as diagnostics and surface when the configuration is set up.
    pub fn from_toml_str(source: &str) -> Result<Self, LoadError> {
        let raw: RawConfig = toml::from_str(source)?;
        Ok(raw.into_config())
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Like [`load`](Config::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, LoadError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// `<config dir>/escapist/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("", "", "escapist")?;
        Some(dirs.config_dir().join("config.toml"))
    }

    /// Validate into [`Settings`], collecting every diagnostic.
    pub fn normalize(self) -> (Settings, Vec<ConfigError>) {
        let mut diagnostics = self.carried;

        let mut pairs = Vec::with_capacity(self.mappings.len());
        for mapping in self.mappings {
            match as_pair(&mapping) {
                Some(pair) => pairs.push(pair),
                None => diagnostics.push(ConfigError::InvalidMapping(mapping)),
            }
        }
        if pairs.is_empty() {
            diagnostics.push(ConfigError::NoValidMappings);
            pairs = DEFAULT_MAPPINGS.iter().filter_map(|m| as_pair(m)).collect();
        }

        let timeout = if self.timeout.is_zero() {
            diagnostics.push(ConfigError::InvalidOption {
                option: "timeout",
                expected: "a positive number of milliseconds",
                value: "0".to_string(),
            });
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        };

        let mut actions = ActionResolver::default();
        for (name, action) in self.escape {
            match name.parse::<Mode>() {
                Err(UnknownMode(name)) => diagnostics.push(ConfigError::UnknownMode(name)),
                Ok(mode) if !mode.supports_escape() => {
                    diagnostics.push(ConfigError::UnsupportedMode(mode))
                }
                Ok(mode) => actions.set(mode, action),
            }
        }

        let settings = Settings {
            table: CombinationTable::from_pairs(pairs.iter().copied()),
            pairs,
            timeout,
            suppress_modified: self.suppress_modified,
            actions,
        };
        (settings, diagnostics)
    }
}

fn as_pair(mapping: &str) -> Option<(char, char)> {
    let mut chars = mapping.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(first), Some(second), None) => Some((first, second)),
        _ => None,
    }
}

/// Validated, immutable configuration owned by a detector.
#[derive(Debug, Clone)]
pub struct Settings {
    pairs: Vec<(char, char)>,
    table: CombinationTable,
    timeout: Duration,
    suppress_modified: bool,
    actions: ActionResolver,
}

impl Default for Settings {
    fn default() -> Self {
        Config::new().normalize().0
    }
}

impl Settings {
    /// The accepted combinations, in configuration order.
    pub fn pairs(&self) -> &[(char, char)] {
        &self.pairs
    }

    pub fn table(&self) -> &CombinationTable {
        &self.table
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn suppress_modified(&self) -> bool {
        self.suppress_modified
    }

    pub fn actions(&self) -> &ActionResolver {
        &self.actions
    }
}

/// On-disk shape. Every field is loosely typed so type errors become
/// diagnostics instead of parse failures.
#[derive(Debug, Deserialize)]
struct RawConfig {
    mappings: Option<toml::Value>,
    timeout: Option<toml::Value>,
    suppress_modified: Option<toml::Value>,
    escape: Option<toml::Value>,
    #[serde(flatten)]
    unknown: toml::Table,
}

impl RawConfig {
    fn into_config(self) -> Config {
        let mut config = Config::new();
        let carried = &mut config.carried;

        if let Some(value) = self.mappings {
            match value {
                toml::Value::Array(items) => {
                    let mut mappings = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            toml::Value::String(s) => mappings.push(s),
                            other => carried.push(ConfigError::NonStringMapping(other.to_string())),
                        }
                    }
                    config.mappings = mappings;
                }
                other => carried.push(ConfigError::InvalidOption {
                    option: "mappings",
                    expected: "an array of strings",
                    value: other.to_string(),
                }),
            }
        }

        if let Some(value) = self.timeout {
            match value {
                toml::Value::Integer(ms) if ms > 0 => {
                    config.timeout = Duration::from_millis(ms.unsigned_abs())
                }
                other => carried.push(ConfigError::InvalidOption {
                    option: "timeout",
                    expected: "a positive number of milliseconds",
                    value: other.to_string(),
                }),
            }
        }

        if let Some(value) = self.suppress_modified {
            match value {
                toml::Value::Boolean(b) => config.suppress_modified = b,
                other => carried.push(ConfigError::InvalidOption {
                    option: "suppress_modified",
                    expected: "a boolean",
                    value: other.to_string(),
                }),
            }
        }

        if let Some(value) = self.escape {
            match value {
                toml::Value::Table(entries) => {
                    for (mode, value) in entries {
                        match value {
                            toml::Value::String(notation) => {
                                config.escape.push((mode, EscapeAction::keys(&notation)))
                            }
                            toml::Value::Boolean(false) => {
                                config.escape.push((mode, EscapeAction::Disabled))
                            }
                            // `true` keeps the built-in action.
                            toml::Value::Boolean(true) => {}
                            other => carried.push(ConfigError::InvalidEscapeValue {
                                mode,
                                value: other.to_string(),
                            }),
                        }
                    }
                }
                other => carried.push(ConfigError::InvalidOption {
                    option: "escape",
                    expected: "a table of mode = action",
                    value: other.to_string(),
                }),
            }
        }

        for key in self.unknown.keys() {
            carried.push(ConfigError::UnknownOption(key.clone()));
        }

        config
    }
}
