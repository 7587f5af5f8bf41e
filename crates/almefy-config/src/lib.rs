//! Configuration for Almefy authentication.
//!
//! Provides TOML-based configuration with:
//! - API credentials (`[api]`), with the secret overridable from the environment
//! - Session cache timing (`[session]`)
//! - Login and authentication paths (`[security]`)
//! - Config file layering (user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    API_SECRET_ENV, ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
