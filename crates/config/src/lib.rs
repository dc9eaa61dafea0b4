//! Configuration loading, env substitution and validation.
//!
//! Config file: `joingate.toml`, searched in `./` then the user config dir
//! (`~/.config/joingate/` on Linux).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{DatabaseConfig, JoingateConfig, SetupConfig, TelegramConfig},
};
