//! Layered connector configuration.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. An optional config file (TOML, YAML or JSON by extension)
//! 3. `TOLLGATE_*` environment variables, e.g. `TOLLGATE_SESSION_ID=work`

use std::path::Path;

use config::{Config, Environment, File, Map};
use tollgate_domain::ConnectorConfig;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or a value could not be deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Loads the connector configuration from `path` and the environment.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed, or if a value has
/// the wrong type.
pub fn load_config(path: Option<&Path>) -> Result<ConnectorConfig, ConfigError> {
    load_config_from(path, None)
}

fn load_config_from(
    path: Option<&Path>,
    env: Option<Map<String, String>>,
) -> Result<ConnectorConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(env),
    );

    let config: ConnectorConfig = builder.build()?.try_deserialize()?;
    tracing::debug!(
        session = %config.session_id,
        endpoint = %config.accounts_endpoint,
        "configuration loaded"
    );
    Ok(config)
}
