// Configuration file loading and creation

use super::types::{ClientConfig, Config};
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Overrides the game service URL from the environment
pub const GAME_SERVICE_URL_ENV: &str = "GAME_SERVICE_URL";
/// Overrides the model path from the environment
pub const MODEL_PATH_ENV: &str = "PONG_AI_MODEL_PATH";

/// Get the path to the configuration file
pub fn get_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("pong-ai");
    path.push("config.toml");
    path
}

/// Load configuration from the default location, creating it if absent
pub fn load_config() -> Result<Config, ConfigError> {
    let path = get_config_path();
    if !path.exists() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        create_default_config(&path)?;
    }
    load_config_from(&path)
}

/// Load configuration from `path`, then apply environment overrides.
///
/// A missing file yields the defaults; an unparsable one is reported and
/// also yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        let contents = fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    reset_zero_timeouts(&mut config);
    Ok(config)
}

/// Replace zero timeouts with the defaults
pub fn reset_zero_timeouts(config: &mut Config) {
    let defaults = ClientConfig::default();
    if config.client.receive_timeout_ms == 0 {
        warn!(default_ms = defaults.receive_timeout_ms, "receive_timeout_ms must be positive, using default");
        config.client.receive_timeout_ms = defaults.receive_timeout_ms;
    }
    if config.client.connect_timeout_ms == 0 {
        warn!(default_ms = defaults.connect_timeout_ms, "connect_timeout_ms must be positive, using default");
        config.client.connect_timeout_ms = defaults.connect_timeout_ms;
    }
}

/// Apply environment overrides through `lookup` (empty values are ignored)
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = value(GAME_SERVICE_URL_ENV) {
        config.client.game_service_url = url;
    }
    if let Some(model_path) = value(MODEL_PATH_ENV) {
        config.policy.model_path = PathBuf::from(model_path);
    }
}

/// Create a default configuration file with helpful comments
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let config = Config::default();
    let toml_string = toml::to_string_pretty(&config)?;

    let commented_toml = format!(
        "# pong-ai Configuration File\n\
         # Restart the player or control service after editing\n\
         #\n\
         # client.paddle: \"left\" or \"right\"\n\
         # client.observation: \"full\" (with ball velocity) or \"reduced\"\n\
         #   must match the layout the model was exported with\n\
         # policy.kind: \"linear\", \"tracking\", \"intercept\"\n\
         #\n\
         # Environment overrides: {} and {}\n\n\
         {}",
        GAME_SERVICE_URL_ENV, MODEL_PATH_ENV, toml_string
    );

    fs::write(path, commented_toml)?;
    info!(path = %path.display(), "Created default config file");
    Ok(())
}
