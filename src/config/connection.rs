//! Database connection settings.
//!
//! The `[connection]` section names a driver and where to find the database:
//!
//! ```toml
//! [connection]
//! driver = "sqlite"
//! path = "${FIXTURE_DB}"
//! schema = "main"
//! ```

use serde::{Deserialize, Serialize};

use super::settings::{expand_env_vars, SettingsError};

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// SQLite (file or in-memory)
    Sqlite,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, SettingsError> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(SettingsError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Database driver.
    pub driver: String,

    /// Database location (supports ${ENV_VAR} expansion). `:memory:` opens an
    /// empty in-memory database.
    pub path: String,

    /// Schema to inspect.
    pub schema: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            path: String::new(),
            schema: "main".to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
    }

    /// Get the path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<String, SettingsError> {
        if self.path.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "connection.path is not set".to_string(),
            ));
        }
        expand_env_vars(&self.path)
    }
}
