//! Application configuration.
//!
//! The client needs two things: the API base URL and a directory for
//! persisted credentials. Both come from the environment (with `.env`
//! support in the binary) and fall back to sensible defaults.

use std::path::PathBuf;

use anyhow::Result;

/// Application name used for the data directory path
const APP_NAME: &str = "taskdeck";

/// Default API base URL when TASKDECK_API_URL is not set
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for the Taskdeck API, without a trailing slash
    pub base_url: String,
    /// Directory holding persisted client state (credential pair)
    pub data_dir: PathBuf,
}

impl Config {
    /// Build a config from the environment.
    ///
    /// `TASKDECK_API_URL` overrides the API base URL and
    /// `TASKDECK_DATA_DIR` overrides the state directory.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("TASKDECK_API_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let data_dir = match std::env::var_os("TASKDECK_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
                .join(APP_NAME),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            data_dir,
        })
    }

    /// Config pointing at an explicit base URL and data directory.
    pub fn new(base_url: impl Into<String>, data_dir: PathBuf) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            data_dir,
        }
    }
}
