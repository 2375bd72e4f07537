//! Configuration types, normalization and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extensions::{DataEntry, DecoratorEntry, HelperEntry, PartialEntry};

/// Default layout directory
pub const DEFAULT_LAYOUTS_DIR: &str = "./layouts/";

/// Default file selection rule
pub const DEFAULT_MATCH: &str = "**/*.html";

/// Default partials pattern
pub const DEFAULT_PARTIALS: &str = "./layouts/partials/**/*";

/// A config value that may be a single item or a list
///
/// `null` deserializes as an absent option; a boolean is accepted and
/// treated as "no entries".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
    Flag(bool),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
            Self::Flag(_) => Vec::new(),
        }
    }

    fn push(self, item: T) -> Self {
        let mut items = self.into_vec();
        items.push(item);
        Self::Many(items)
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(item: T) -> Self {
        Self::One(item)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

/// Options for the file selection rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Let wildcards match names with a leading dot
    pub dot: bool,

    /// Case-insensitive matching
    pub nocase: bool,

    /// Match patterns without a slash against the base name only
    #[serde(rename = "match-base", alias = "matchBase")]
    pub match_base: bool,
}

/// User-supplied plugin options, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    /// Shared data sources
    pub data: Option<OneOrMany<DataEntry>>,

    /// Native decorators (code only)
    #[serde(skip)]
    pub decorators: Option<OneOrMany<DecoratorEntry>>,

    /// Native helpers (code only)
    #[serde(skip)]
    pub helpers: Option<OneOrMany<HelperEntry>>,

    /// Partial template sources
    pub partials: Option<OneOrMany<PartialEntry>>,

    /// Directory of layout templates
    pub layouts: Option<PathBuf>,

    /// File selection patterns
    #[serde(rename = "match")]
    pub match_patterns: Option<OneOrMany<String>>,

    /// Options for the file selection patterns
    #[serde(rename = "match-options", alias = "matchOptions")]
    pub match_options: Option<MatchSettings>,
}

impl PluginOptions {
    /// Add a shared data source
    pub fn with_data(mut self, entry: DataEntry) -> Self {
        self.data = Some(append(self.data, entry));
        self
    }

    /// Add a native decorator
    pub fn with_decorator(mut self, entry: DecoratorEntry) -> Self {
        self.decorators = Some(append(self.decorators, entry));
        self
    }

    /// Add a native helper
    pub fn with_helper(mut self, entry: HelperEntry) -> Self {
        self.helpers = Some(append(self.helpers, entry));
        self
    }

    /// Add a partial source
    pub fn with_partials(mut self, entry: PartialEntry) -> Self {
        self.partials = Some(append(self.partials, entry));
        self
    }

    /// Set the layout directory
    pub fn with_layouts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layouts = Some(dir.into());
        self
    }

    /// Set the file selection pattern(s)
    pub fn with_match(mut self, patterns: impl Into<OneOrMany<String>>) -> Self {
        self.match_patterns = Some(patterns.into());
        self
    }

    /// Resolve relative paths against a base directory
    ///
    /// Used for options read from a config file so paths are relative to the file.
    pub fn relative_to(mut self, base: &Path) -> Self {
        debug!(?base, "PluginOptions::relative_to: called");
        self.layouts = self.layouts.map(|dir| rebase_path(base, &dir));
        self.data = self.data.map(|entries| {
            OneOrMany::Many(
                entries
                    .into_vec()
                    .into_iter()
                    .map(|entry| match entry {
                        DataEntry::Pattern(p) if !p.trim().is_empty() => DataEntry::Pattern(rebase_pattern(base, &p)),
                        other => other,
                    })
                    .collect(),
            )
        });
        self.partials = self.partials.map(|entries| {
            OneOrMany::Many(
                entries
                    .into_vec()
                    .into_iter()
                    .map(|entry| match entry {
                        PartialEntry::Pattern(p) if !p.trim().is_empty() => {
                            PartialEntry::Pattern(rebase_pattern(base, &p))
                        }
                        other => other,
                    })
                    .collect(),
            )
        });
        self
    }
}

fn append<T>(existing: Option<OneOrMany<T>>, item: T) -> OneOrMany<T> {
    match existing {
        Some(items) => items.push(item),
        None => OneOrMany::One(item),
    }
}

fn rebase_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}

fn rebase_pattern(base: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        base.join(pattern).to_string_lossy().into_owned()
    }
}

/// Fully populated plugin configuration
///
/// Every extension category is a list, never a bare value, so registration
/// has a single code path.
#[derive(Debug, Clone)]
pub struct LayoutsConfig {
    pub data: Vec<DataEntry>,
    pub decorators: Vec<DecoratorEntry>,
    pub helpers: Vec<HelperEntry>,
    pub partials: Vec<PartialEntry>,
    pub layouts: PathBuf,
    pub match_patterns: Vec<String>,
    pub match_options: MatchSettings,
}

impl Default for LayoutsConfig {
    fn default() -> Self {
        normalize(None)
    }
}

/// Fill unset options with defaults and coerce extension categories into lists
pub fn normalize(options: Option<PluginOptions>) -> LayoutsConfig {
    debug!(has_options = options.is_some(), "normalize: called");
    let options = options.unwrap_or_default();

    let data: Vec<DataEntry> = options
        .data
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|entry| !entry.is_empty())
        .collect();

    let partials: Vec<PartialEntry> = match options.partials {
        Some(entries) => entries.into_vec().into_iter().filter(|entry| !entry.is_empty()).collect(),
        None => {
            debug!("normalize: partials unset, using default pattern");
            vec![PartialEntry::Pattern(DEFAULT_PARTIALS.to_string())]
        }
    };

    let match_patterns: Vec<String> = options
        .match_patterns
        .map(OneOrMany::into_vec)
        .map(|patterns| patterns.into_iter().filter(|p| !p.is_empty()).collect::<Vec<_>>())
        .filter(|patterns| !patterns.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_MATCH.to_string()]);

    let config = LayoutsConfig {
        data,
        decorators: options.decorators.map(OneOrMany::into_vec).unwrap_or_default(),
        helpers: options.helpers.map(OneOrMany::into_vec).unwrap_or_default(),
        partials,
        layouts: options.layouts.unwrap_or_else(|| PathBuf::from(DEFAULT_LAYOUTS_DIR)),
        match_patterns,
        match_options: options.match_options.unwrap_or_default(),
    };
    debug!(
        data = config.data.len(),
        decorators = config.decorators.len(),
        helpers = config.helpers.len(),
        partials = config.partials.len(),
        layouts = ?config.layouts,
        "normalize: resolved configuration"
    );
    config
}

/// Configuration for the `lsm` command-line build
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory of content files
    pub source: PathBuf,

    /// Directory rendered files are written to
    pub destination: PathBuf,

    /// Remove the destination before writing
    pub clean: bool,

    /// Parse YAML front matter into file metadata
    #[serde(rename = "front-matter", alias = "frontmatter")]
    pub front_matter: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Layout plugin options
    pub plugin: PluginOptions,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            destination: PathBuf::from("build"),
            clean: false,
            front_matter: true,
            log_level: None,
            plugin: PluginOptions::default(),
        }
    }
}

/// Project-local config file name
pub const LOCAL_CONFIG: &str = "layoutsmith.yml";

impl SiteConfig {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./layoutsmith.yml`, then the user config
    /// directory, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("layoutsmith").join(LOCAL_CONFIG);
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, ignoring any error
    ///
    /// Runs before logging is set up, so failures are silent here and
    /// reported by the full load.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => PathBuf::from(LOCAL_CONFIG),
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded config from: {}", path.display());

        let base = path.parent().filter(|p| !p.as_os_str().is_empty());
        Ok(match base {
            Some(base) => config.relative_to(base),
            None => config,
        })
    }

    fn relative_to(self, base: &Path) -> Self {
        Self {
            source: rebase_path(base, &self.source),
            destination: rebase_path(base, &self.destination),
            plugin: self.plugin.relative_to(base),
            ..self
        }
    }
}
