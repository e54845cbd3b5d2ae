//! Persisted CLI settings

use anyhow::{Context, Result};
use artif_core::config::{Environment, ServerConfig};
use artif_core::Settings;
use std::path::{Path, PathBuf};

pub struct SettingsManager;

impl SettingsManager {
    /// Get the artif home directory (~/.artif)
    pub fn artif_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("ARTIF_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".artif"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::artif_home()?.join("settings.json"))
    }

    /// Load settings from disk; a missing file yields defaults
    pub fn load() -> Result<Settings> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Settings> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {:?}", path))
    }

    /// Save settings to disk
    pub fn save(settings: &Settings) -> Result<()> {
        Self::save_to(settings, &Self::settings_path()?)
    }

    pub fn save_to(settings: &Settings, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        // Restrict to owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Connection from flags, then environment, then settings
    pub fn server_config(
        server: Option<String>,
        token: Option<String>,
        timeout_secs: Option<u64>,
        env: &Environment,
    ) -> Result<ServerConfig> {
        let settings = Self::load()?;
        let mut config = ServerConfig::new(server.unwrap_or_default(), token.unwrap_or_default());
        config.timeout_secs = timeout_secs;
        Ok(config.with_env(env).with_settings(&settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsManager::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            server: "https://server.com:8081/artifactory/api".to_string(),
            token: "secret".to_string(),
            timeout_secs: Some(30),
            ..Default::default()
        };

        SettingsManager::save_to(&settings, &path).unwrap();
        assert_eq!(SettingsManager::load_from(&path).unwrap(), settings);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
