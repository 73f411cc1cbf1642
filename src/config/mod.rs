// Configuration module for pong-ai
// Handles loading player and control-service settings from a TOML file

pub mod loader;
pub mod types;

pub use loader::{
    apply_env_overrides, create_default_config, get_config_path, load_config, load_config_from, reset_zero_timeouts,
};
pub use types::{ClientConfig, Config, PolicyConfig, ServerConfig};
