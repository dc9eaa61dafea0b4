use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::JoingateConfig,
};

const CONFIG_FILENAME: &str = "joingate.toml";

/// Load config from `path`, substituting `${ENV}` placeholders first.
pub fn load_config(path: &Path) -> Result<JoingateConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&substitute_env(&raw))?)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./joingate.toml` (project-local)
/// 2. `~/.config/joingate/joingate.toml` (user-global)
///
/// Returns `JoingateConfig::default()` if no config file is found or the
/// file fails to parse.
pub fn discover_and_load() -> JoingateConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    JoingateConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .filter(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/joingate/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "joingate").map(|d| d.config_dir().to_path_buf())
}

/// Apply `BOT_TOKEN`, `SUPER_ADMIN_ID` and `JOINGATE_DB` on top of a loaded
/// config. A `SUPER_ADMIN_ID` that is not an integer is an error.
pub fn apply_env_overrides(
    config: &mut JoingateConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.is_empty()) {
        config.telegram.token = Secret::new(token);
    }
    if let Some(raw) = lookup("SUPER_ADMIN_ID") {
        config.telegram.super_admin_id = raw
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("SUPER_ADMIN_ID is not a user id: {raw:?}")))?;
    }
    if let Some(path) = lookup("JOINGATE_DB").filter(|p| !p.is_empty()) {
        config.database.path = PathBuf::from(path);
    }
    Ok(())
}
