use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat, Map};
use std::fs;

/// Prefix of environment overrides, e.g. `CANDLESCOPE_API_URL`
pub const ENV_PREFIX: &str = "CANDLESCOPE";

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE_NAME: &str = "candlescope.yaml";

/// Configuration manager for loading and saving the settings file.
///
/// Settings are resolved in layers, later layers winning:
/// 1. Built-in defaults ([`Settings::default`])
/// 2. `candlescope.yaml` in the configuration directory (optional)
/// 3. `CANDLESCOPE_*` environment variables
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the settings file (e.g., "Candlescope Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
        })
    }

    /// Load settings from defaults, the settings file and the process environment.
    pub fn load_settings(&self) -> Result<Settings> {
        self.load_settings_with_env(None)
    }

    /// Load settings, taking environment overrides from `env` instead of the process
    /// environment when it is provided.
    pub fn load_settings_with_env(&self, env: Option<Map<String, String>>) -> Result<Settings> {
        let defaults =
            Config::try_from(&Settings::default()).context("Failed to build default settings")?;

        let environment = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(env);

        if !self.settings_path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults and environment",
                self.settings_path
            );
        }

        let settings: Settings = Config::builder()
            .add_source(defaults)
            .add_source(
                File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to load settings from {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write a settings file with default values if none exists yet.
    ///
    /// Returns `true` when a new file was written.
    pub fn ensure_settings_file(&self) -> Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }

        self.save_settings(&Settings::default())?;
        Ok(true)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.config_dir().exists());
        assert!(manager.settings_path().as_str().ends_with(SETTINGS_FILE_NAME));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = manager.load_settings_with_env(Some(Map::new())).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_ensure_settings_file_writes_once() {
        let (manager, _temp_dir) = create_test_config_manager();

        assert!(manager.ensure_settings_file().unwrap());
        assert!(manager.settings_path().exists());
        assert!(!manager.ensure_settings_file().unwrap());
    }
}
