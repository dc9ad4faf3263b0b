//! Configuration management module.
//!
//! This module handles loading and saving the configuration file, which holds
//! the service base URL, the log level, and the persisted session.

mod error;

pub use error::ConfigError;

use crate::api::{UserRecord, DEFAULT_BASE_URL};
use crate::session::SessionStorage;
use log::{error, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

const FILE_NAME: &str = "config.yml";
const DEFAULT_DIRECTORY_PATH: &str = ".config/board-client";

/// Oversees management of configuration file.
///
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub log_level: String,
    pub access_token: Option<String>,
    pub user: Option<UserRecord>,
    file_path: Option<PathBuf>,
}

/// Define specification for configuration file.
///
#[derive(Serialize, Deserialize)]
struct FileSpec {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// Return a new instance with default settings and no session.
    ///
    pub fn new() -> Config {
        Config {
            base_url: default_base_url(),
            log_level: default_log_level(),
            access_token: None,
            user: None,
            file_path: None,
        }
    }

    /// Try to load an existing configuration from the disk using the custom
    /// directory if provided. A missing file leaves the defaults in place;
    /// it is written on the first save.
    ///
    pub fn load(&mut self, custom_path: Option<&str>) -> Result<(), ConfigError> {
        let dir_path = match custom_path {
            Some(path) => Path::new(&path).to_path_buf(),
            None => Config::default_path()?,
        };

        if !dir_path.exists() {
            fs::create_dir_all(&dir_path).map_err(|e| ConfigError::CreateDirectoryFailed {
                path: dir_path.clone(),
                source: e,
            })?;
        }

        self.file_path = Some(dir_path.join(Path::new(FILE_NAME)));
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;

        if file_path.exists() {
            let contents = fs::read_to_string(file_path).map_err(|e| ConfigError::LoadFailed {
                path: file_path.clone(),
                message: format!("IO error: {}", e),
            })?;
            let data: FileSpec = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::DeserializationFailed(e.to_string()))?;
            check_base_url(&data.base_url)?;
            self.base_url = data.base_url;
            self.log_level = data.log_level;
            self.user = match (&data.access_token, data.user) {
                (None, Some(user)) => {
                    warn!("{}", ConfigError::OrphanedUser(user.user_id));
                    None
                }
                (_, user) => user,
            };
            self.access_token = data.access_token;
        }

        Ok(())
    }

    /// Save the current configuration to disk.
    ///
    pub fn save(&self) -> Result<(), ConfigError> {
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;
        let data = FileSpec {
            base_url: self.base_url.clone(),
            log_level: self.log_level.clone(),
            access_token: self.access_token.clone(),
            user: self.user.clone(),
        };
        let content = serde_yaml::to_string(&data)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        if let Some(parent) = file_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut file = fs::File::create(file_path).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        write!(file, "{}", content).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        file.flush().map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        Ok(())
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Parsed log level, falling back to `info` for unknown names.
    ///
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    /// Returns the path buffer for the default configuration directory or an
    /// error if the home directory could not be found.
    ///
    fn default_path() -> Result<PathBuf, ConfigError> {
        match dirs::home_dir() {
            Some(home) => Ok(Path::new(&home).join(Path::new(DEFAULT_DIRECTORY_PATH))),
            None => Err(ConfigError::HomeDirectoryNotFound),
        }
    }
}

fn check_base_url(base_url: &str) -> Result<(), ConfigError> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidBaseUrl(base_url.to_string()))
    }
}

/// Session storage persisted in the configuration file. Every change is
/// written through; write failures are logged and the in-memory value kept.
///
pub struct FileStorage {
    config: Config,
}

impl FileStorage {
    pub fn new(config: Config) -> Self {
        FileStorage { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn persist(&self) {
        if let Err(e) = self.config.save() {
            error!("Failed to persist session: {}", e);
        }
    }
}

impl SessionStorage for FileStorage {
    fn get_token(&self) -> Option<String> {
        self.config.access_token.clone()
    }

    fn set_token(&mut self, token: String) {
        self.config.access_token = Some(token);
        self.persist();
    }

    fn get_user(&self) -> Option<UserRecord> {
        self.config.user.clone()
    }

    fn set_user(&mut self, user: Option<UserRecord>) {
        self.config.user = user;
        self.persist();
    }

    fn clear_token(&mut self) {
        self.config.access_token = None;
        self.persist();
    }

    fn clear_user(&mut self) {
        self.config.user = None;
        self.persist();
    }

    fn store(&mut self, token: String, user: UserRecord) {
        self.config.access_token = Some(token);
        self.config.user = Some(user);
        self.persist();
    }

    fn clear(&mut self) {
        self.config.access_token = None;
        self.config.user = None;
        self.persist();
    }
}
