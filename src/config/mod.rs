//! Configuration module for fixgraph.
//!
//! Handles connection configuration, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{ConnectionSettings, Driver};
pub use settings::{
    expand_env_vars, ExtractSettings, InclusionSettings, NamingSettings, ResolveSettings, Settings,
    SettingsError,
};
