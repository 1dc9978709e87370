//! Runtime configuration loader for Parlor.
//!
//! Reads `config.toml` and deserializes it into [`RuntimeConfig`]. The file
//! is located from (in order) an explicit path, the `PARLOR_CONFIG`
//! environment variable, or `~/.parlor/config.toml`. Falls back to defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use parlor_types::config::{ProviderSettings, RuntimeConfig};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PARLOR_CONFIG";

/// `~/.parlor/config.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".parlor").join("config.toml"))
}

/// Pick the config file to read.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_config_path_from(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn resolve_config_path_from(explicit: Option<&Path>, from_env: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(from_env.filter(|p| !p.as_os_str().is_empty()))
        .or_else(default_config_path)
}

/// Load configuration from `path`.
///
/// - `None` or a missing file returns [`RuntimeConfig::default()`].
/// - A file that cannot be read or parsed logs a warning and returns the default.
pub async fn load_config(path: Option<&Path>) -> RuntimeConfig {
    let Some(path) = path else {
        tracing::debug!("No config path available, using defaults");
        return RuntimeConfig::default();
    };

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return RuntimeConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return RuntimeConfig::default();
        }
    };

    match toml::from_str::<RuntimeConfig>(&content) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {}", path.display());
            config
        }
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            RuntimeConfig::default()
        }
    }
}

/// Read the provider API key from the configured environment variable.
///
/// Empty values count as unset.
pub fn resolve_api_key(settings: &ProviderSettings) -> Option<SecretString> {
    std::env::var(&settings.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}
