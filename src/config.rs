use crate::error::{ConsoleError, ConsoleResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the `kiln` binary, loaded from a TOML file. Everything here
/// configures the wiring around the engine; the engine itself is driven by
/// per-run option layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    /// Whether interactive runs print a welcome banner.
    pub banner: bool,
    /// Overrides the banner text when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_text: Option<String>,
    /// Overrides the primary prompt when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Overrides the continuation prompt when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_prompt: Option<String>,
    pub history_file: PathBuf,
    /// Whether evaluation errors are reported and the session continues, or
    /// abort the run.
    pub rescue_errors: bool,
}

impl Default for KilnConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kiln");
        Self {
            banner: true,
            banner_text: None,
            prompt: None,
            continuation_prompt: None,
            history_file: data_dir.join("history.txt"),
            rescue_errors: true,
        }
    }
}

impl KilnConfig {
    /// Load configuration from `config_path`, or from the default location,
    /// falling back to defaults when no file exists yet.
    pub fn load(config_path: Option<&Path>) -> ConsoleResult<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path(),
        };
        if !config_file.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_file)?;
        toml::from_str(&content)
            .map_err(|e| ConsoleError::config(format!("failed to parse config: {e}")))
    }

    pub fn save(&self, config_path: Option<&Path>) -> ConsoleResult<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path(),
        };
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConsoleError::config(format!("failed to serialize config: {e}")))?;
        std::fs::write(config_file, content)?;
        Ok(())
    }

    /// Write the default config file, refusing to clobber an existing one
    /// unless forced.
    pub fn init(&self, force: bool) -> ConsoleResult<()> {
        let config_file = Self::default_path();
        if config_file.exists() && !force {
            return Err(ConsoleError::config(
                "configuration file already exists; use --force to overwrite",
            ));
        }
        self.save(None)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kiln")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KilnConfig::default();
        assert!(config.banner);
        assert!(config.rescue_errors);
        assert!(config.prompt.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = KilnConfig::default();
        config.prompt = Some("calc> ".to_string());
        config.banner = false;
        config.save(Some(&path)).unwrap();

        let loaded = KilnConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.prompt.as_deref(), Some("calc> "));
        assert!(!loaded.banner);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = KilnConfig::load(Some(&path)).unwrap();
        assert!(config.banner);
    }

    #[test]
    fn test_unparseable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "banner = \"not a bool").unwrap();
        assert!(matches!(
            KilnConfig::load(Some(&path)),
            Err(ConsoleError::Config(_))
        ));
    }
}
