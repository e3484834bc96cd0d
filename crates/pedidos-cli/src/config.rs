//! Application configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use remito_auth::OAuthConfig;

/// Static configuration: OAuth client credentials, output targets, and
/// path overrides. Loaded from a JSON file under the platform config
/// directory; every path can be overridden for tests.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OAuth client id from the Google console.
    pub client_id: String,
    /// OAuth client secret from the Google console.
    pub client_secret: String,
    /// Drive folder id receiving the derived CSV export, if any.
    pub drive_folder_id: Option<String>,
    /// Override for the credential registry file.
    pub credentials_path: Option<PathBuf>,
    /// Override for the local export directory.
    pub export_dir: Option<PathBuf>,
    /// Loopback redirect port for the consent flow.
    pub redirect_port: Option<u16>,
}

impl AppConfig {
    /// Load the config file, or defaults when none exists yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// The OAuth client configuration for the consent and refresh flows.
    pub fn oauth(&self) -> OAuthConfig {
        let mut config = OAuthConfig::google(&self.client_id, &self.client_secret);
        if let Some(port) = self.redirect_port {
            config.redirect_port = port;
        }
        config
    }

    /// Where the credential registry lives.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.credentials_path {
            Some(path) => Ok(path.clone()),
            None => {
                let dirs = project_dirs()?;
                Ok(dirs.data_dir().join("credentials.json"))
            }
        }
    }

    /// Where local CSV exports land.
    pub fn export_dir(&self) -> Result<PathBuf> {
        match &self.export_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let dirs = directories::UserDirs::new()
                    .context("Could not determine home directory")?;
                Ok(dirs
                    .desktop_dir()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dirs.home_dir().to_path_buf()))
            }
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "remito").context("Could not determine config directory")
}

/// Default config file path.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert!(config.client_id.is_empty());
        assert!(config.drive_folder_id.is_none());
    }

    #[test]
    fn file_overrides_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            serde_json::json!({
                "client_id": "abc.apps.googleusercontent.com",
                "client_secret": "shh",
                "drive_folder_id": "folder-1",
                "redirect_port": 9090
            })
            .to_string(),
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(config.drive_folder_id.as_deref(), Some("folder-1"));
        assert_eq!(config.oauth().redirect_port, 9090);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
