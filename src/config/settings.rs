//! TOML-based configuration for fixgraph.
//!
//! Supports a config file (fixgraph.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [connection]
//! driver = "sqlite"
//! path = "${FIXTURE_DB}"
//!
//! [extract]
//! tables = []              # empty: every table, in dependency order
//! exclude = ["^audit_"]
//! fetch_size = 500
//!
//! [resolve]
//! unresolved_required = "fail"   # or "warn"
//!
//! [inclusion]
//! default = "keep"
//! drop = ["session"]
//! existing = ["country"]
//!
//! [naming]
//! singularize_entities = true
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::ConnectionSettings;
use crate::entity::extract::DEFAULT_FETCH_SIZE;
use crate::entity::UnresolvedPolicy;
use crate::plan::Inclusion;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: sqlite")]
    UnsupportedDriver(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub extract: ExtractSettings,
    pub resolve: ResolveSettings,
    pub inclusion: InclusionSettings,
    pub naming: NamingSettings,
}

/// Row extraction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Explicit extraction order. Empty means every table in dependency order.
    pub tables: Vec<String>,

    /// Regular expressions; matching tables are left out of the schema.
    pub exclude: Vec<String>,

    /// Rows fetched per batch.
    pub fetch_size: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            exclude: Vec::new(),
            fetch_size: DEFAULT_FETCH_SIZE,
        }
    }
}

impl ExtractSettings {
    /// Compile the exclude patterns.
    pub fn exclude_patterns(&self) -> Result<Vec<Regex>, SettingsError> {
        self.exclude
            .iter()
            .map(|p| Regex::new(p).map_err(SettingsError::from))
            .collect()
    }
}

/// Reference resolution settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolveSettings {
    /// Policy for required references without a match.
    pub unresolved_required: UnresolvedPolicy,
}

/// Table-based inclusion rules.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InclusionSettings {
    /// Decision for tables not listed below.
    pub default: Inclusion,

    /// Tables whose rows are left out.
    pub drop: Vec<String>,

    /// Tables whose rows are assumed present in the target system.
    pub existing: Vec<String>,
}

impl InclusionSettings {
    /// (table, decision) pairs for every listed table.
    pub fn rules(&self) -> impl Iterator<Item = (&str, Inclusion)> {
        self.drop
            .iter()
            .map(|t| (t.as_str(), Inclusion::Drop))
            .chain(self.existing.iter().map(|t| (t.as_str(), Inclusion::Existing)))
    }
}

/// Naming strategy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingSettings {
    /// Singularize table names for entity type names.
    pub singularize_entities: bool,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            singularize_entities: true,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `FIXGRAPH_CONFIG`
    /// 2. `./fixgraph.toml`
    /// 3. `~/.config/fixgraph/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        // Check environment variable first
        if let Ok(path) = env::var("FIXGRAPH_CONFIG") {
            return Self::from_file(&path);
        }

        // Check local directory
        let local_config = PathBuf::from("fixgraph.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fixgraph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.connection.driver_type()?;
        self.extract.exclude_patterns()?;

        if self.extract.fetch_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "extract.fetch_size must be positive".to_string(),
            ));
        }
        if let Some(table) = self
            .inclusion
            .drop
            .iter()
            .find(|t| self.inclusion.existing.contains(t))
        {
            return Err(SettingsError::InvalidConfig(format!(
                "table {} is listed under both inclusion.drop and inclusion.existing",
                table
            )));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
