//! Load configuration from XDG `config.toml` and project `.env`, apply it to the process
//! environment with priority **existing env > .env > XDG**, then resolve typed settings.
//!
//! `config.toml` lives at `$XDG_CONFIG_HOME/<app>/config.toml` and may hold two tables:
//!
//! ```toml
//! [env]
//! RUST_LOG = "histrim=debug"
//!
//! [compaction]
//! target_reduction_ratio = 0.25
//! minimum_messages = 20
//! compression_order = "after_pruning"
//! ```
//!
//! `[compaction]` values are then overridden by `<APP>_*` variables such as
//! `HISTRIM_MINIMUM_MESSAGES`, which may themselves come from `.env`.

mod dotenv;
mod settings;
mod xdg_toml;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use settings::{env_prefix, CompactionSection, Settings};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Path of the app's `config.toml`, whether or not it exists.
pub fn config_file_path(app_name: &str) -> Result<PathBuf, LoadError> {
    xdg_toml::config_path(app_name)
}

/// Loads XDG `config.toml` and optional project `.env`, sets environment variables only for
/// keys that are **not** already set, and returns the resolved [`Settings`].
///
/// Order of precedence when a key is missing in the process environment:
/// 1. Value from project `.env` (current directory or `override_dir` if given)
/// 2. Value from the `[env]` table of `$XDG_CONFIG_HOME/<app_name>/config.toml`
///
/// The `[compaction]` table is overlaid with `<APP>_*` variables after the env is applied.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Settings, LoadError> {
    let file = xdg_toml::load_config(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let mut keys: std::collections::HashSet<&String> = file.env.keys().collect();
    keys.extend(dotenv_map.keys());

    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| file.env.get(key)) {
            std::env::set_var(key, v);
        }
    }

    let mut compaction = file.compaction;
    compaction.overlay_env(&env_prefix(app_name))?;
    Ok(Settings { compaction })
}
