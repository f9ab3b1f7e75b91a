//! Runtime configuration.
//!
//! Settings come from a JSON file (missing file means defaults), then the
//! `ASSET_UPLOADER_*` environment variables, then command-line flags.

use crate::error::ConfigError;
use crate::upload::FileDescriptor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

pub const ENV_BASE_URL: &str = "ASSET_UPLOADER_BASE_URL";
pub const ENV_TOKEN: &str = "ASSET_UPLOADER_TOKEN";

const APP_DIR: &str = "asset-uploader";

/// Limits applied by the upload manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Cap on the number of tracked files, seeded ones included.
    pub max_files: usize,
    /// Per-file byte ceiling.
    pub max_size: u64,
    /// Comma separated MIME patterns, `*` accepts everything.
    pub accept: String,
    /// When false a selection or drop is cut down to its first file.
    pub multiple: bool,
    /// Already-uploaded files shown as completed from the start.
    pub initial_files: Vec<FileDescriptor>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_size: DEFAULT_MAX_SIZE,
            accept: "*".to_string(),
            multiple: true,
            initial_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Bytes per body chunk; one progress report per chunk at most.
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 300,
            chunk_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientConfig,
    pub upload: UploadConfig,
    pub session_file: Option<PathBuf>,
    /// Token from the environment; takes precedence over the session file.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
    }

    pub fn default_session_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("session"))
    }

    /// Reads `path`, or the default location when `None`. A file that does
    /// not exist yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!("Loaded config from {:?}", path);
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `ASSET_UPLOADER_BASE_URL` and `ASSET_UPLOADER_TOKEN`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_TOKEN).ok(),
        );
    }

    fn apply_overrides(&mut self, base_url: Option<String>, token: Option<String>) {
        if let Some(base_url) = base_url.filter(|v| !v.trim().is_empty()) {
            self.client.base_url = base_url;
        }
        if let Some(token) = token.filter(|v| !v.trim().is_empty()) {
            self.token = Some(token);
        }
    }

    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file.clone().or_else(Self::default_session_path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_files == 0 {
            return Err(ConfigError::Invalid("max_files must be at least 1".into()));
        }
        if self.client.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if !self.client.base_url.starts_with("http://")
            && !self.client.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got {}",
                self.client.base_url
            )));
        }
        if self.upload.initial_files.len() > self.upload.max_files {
            return Err(ConfigError::Invalid(format!(
                "{} initial files exceed max_files ({})",
                self.upload.initial_files.len(),
                self.upload.max_files
            )));
        }
        Ok(())
    }
}
