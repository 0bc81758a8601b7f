// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_ID, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_DB_PATH, ENV_USER_AGENT};
use crate::reddit::Credentials;
use crate::state::RefreshInterval;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistent application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub refresh_interval: RefreshInterval,
    /// Database location; the XDG data directory when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl AppSettings {
    /// Get the settings file path (~/.config/io.github.threadmood/settings.json)
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found.
    /// Environment variables override the file.
    pub fn load() -> Self {
        let from_file = Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .map(|contents| Self::parse(&contents))
            .unwrap_or_default();

        from_file.with_overrides(|name| std::env::var(name).ok())
    }

    /// Parse a settings file, falling back to defaults when it is invalid
    pub fn parse(contents: &str) -> Self {
        serde_json::from_str(contents).unwrap_or_else(|e| {
            warn!("Ignoring invalid settings file: {}", e);
            Self::default()
        })
    }

    /// Apply non-empty values from `lookup` over the loaded settings
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_CLIENT_ID) {
            self.credentials.client_id = v;
        }
        if let Some(v) = get(ENV_CLIENT_SECRET) {
            self.credentials.client_secret = v;
        }
        if let Some(v) = get(ENV_USER_AGENT) {
            self.credentials.user_agent = v;
        }
        if let Some(v) = get(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(v));
        }
        self
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write settings to `path`, readable by the owner only
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(path)?;

        // An existing file keeps its old mode unless reset
        #[cfg(unix)]
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;

        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
