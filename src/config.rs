//! Runtime configuration.
//!
//! The Google Cloud project id comes from the bundled `config.json` settings
//! file; everything else is read from the environment (after `.env` has been
//! loaded by `main`).

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LANGUAGE_API_URL: &str = "https://language.googleapis.com";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("project ID wasn't defined (set projectID in {} or GOOGLE_CLOUD_PROJECT)", .0.display())]
    MissingProjectId(PathBuf),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Shape of the bundled settings resource.
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(rename = "projectID")]
    project_id: Option<String>,
}

/// Reads the project id from a settings file such as `{"projectID": "alpollo"}`.
pub fn load_project_id(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: SettingsFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    settings
        .project_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingProjectId(path.to_path_buf()))
}

/// Settings for talking to the Natural Language API.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Sent as `X-Goog-User-Project` on every request.
    pub project_id: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// When unset, songs and counters are kept in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub language: LanguageConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = PathBuf::from(
            env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        );

        let project_id = match non_empty_var("GOOGLE_CLOUD_PROJECT") {
            Some(id) => id,
            None => load_project_id(&config_path)?,
        };

        let db_max_connections = match non_empty_var("DB_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value,
            })?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Self {
            bind_addr: non_empty_var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: non_empty_var("DATABASE_URL"),
            db_max_connections,
            language: LanguageConfig {
                project_id,
                api_url: non_empty_var("LANGUAGE_API_URL")
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_API_URL.to_string()),
                api_key: non_empty_var("LANGUAGE_API_KEY"),
                access_token: non_empty_var("LANGUAGE_API_TOKEN"),
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
