//! Load `$XDG_CONFIG_HOME/<app>/config.toml`: the `[env]` table and the `[compaction]` table.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::settings::CompactionSection;
use crate::LoadError;

/// `$XDG_CONFIG_HOME` if set, else the platform config dir from `dirs`.
fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".into()))
}

pub(crate) fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    Ok(config_home()?.join(app_name).join("config.toml"))
}

#[derive(serde::Deserialize, Default, Debug)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub compaction: CompactionSection,
}

/// Parses the app's config file. Missing file returns an empty config.
pub(crate) fn load_config(app_name: &str) -> Result<ConfigFile, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::with_xdg_home;

    #[test]
    fn missing_config_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = with_xdg_home(dir.path(), || load_config("histrim")).unwrap();
        assert!(config.env.is_empty());
        assert_eq!(config.compaction, CompactionSection::default());
    }

    #[test]
    fn reads_env_and_compaction_tables() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("histrim");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("config.toml"),
            r#"
[env]
RUST_LOG = "histrim=debug"

[compaction]
minimum_messages = 25
compression_order = "before_pruning"
"#,
        )
        .unwrap();

        let config = with_xdg_home(dir.path(), || load_config("histrim")).unwrap();
        assert_eq!(config.env.get("RUST_LOG"), Some(&"histrim=debug".to_string()));
        assert_eq!(config.compaction.minimum_messages, Some(25));
        assert_eq!(
            config.compaction.compression_order.as_deref(),
            Some("before_pruning")
        );
        assert_eq!(config.compaction.target_reduction_ratio, None);
    }

    #[test]
    fn config_without_known_tables_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("histrim");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), "[other]\nkey = \"ignored\"\n").unwrap();

        let config = with_xdg_home(dir.path(), || load_config("histrim")).unwrap();
        assert!(config.env.is_empty());
        assert_eq!(config.compaction, CompactionSection::default());
    }

    #[test]
    fn invalid_toml_returns_xdg_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("histrim");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), "not valid toml [[[\n").unwrap();

        let result = with_xdg_home(dir.path(), || load_config("histrim"));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }

    #[test]
    fn wrong_value_type_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("histrim");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("config.toml"),
            "[compaction]\nminimum_messages = \"many\"\n",
        )
        .unwrap();

        let result = with_xdg_home(dir.path(), || load_config("histrim"));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
