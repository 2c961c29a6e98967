//! Translation API credentials, kept in a small JSON file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// Application id and secret key for the translation service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub appid: String,
    #[serde(default)]
    pub key: String,
}

impl Credentials {
    pub fn new(appid: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            appid: appid.into().trim().to_string(),
            key: key.into().trim().to_string(),
        }
    }

    /// Both fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.appid.trim().is_empty() && !self.key.trim().is_empty()
    }
}

/// Reads and writes [`Credentials`] at a fixed path
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Stored credentials, or `None` when the file is missing, unreadable or
    /// incomplete.
    pub fn load(&self) -> Option<Credentials> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::info!("No translation config at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&content) {
            Ok(credentials) if credentials.is_complete() => Some(credentials),
            Ok(_) => {
                log::info!("Translation config {} is incomplete", self.path.display());
                None
            }
            Err(e) => {
                log::warn!("Failed to parse translation config {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, credentials: &Credentials) -> Result<(), TranslateError> {
        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        log::info!("Saved translation config to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
