//! Durable storage for the access/refresh credential pair.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Credential file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// The current access and refresh tokens.
///
/// Invariant: both tokens present or neither. A partial pair on disk
/// (hand-edited file, interrupted write) is treated as logged out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

/// On-disk form, tolerant of missing fields so a damaged file reads as
/// "absent" rather than failing to parse.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPair {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

impl StoredPair {
    fn into_pair(self) -> Option<CredentialPair> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(CredentialPair { access, refresh })
            }
            _ => None,
        }
    }
}

/// File-backed store for the credential pair.
///
/// Every `save` and `clear` is written through to disk before it becomes
/// visible to readers, so the pair survives process restarts and a reader
/// never observes state that would be lost on crash.
pub struct CredentialStore {
    path: PathBuf,
    current: Mutex<Option<CredentialPair>>,
}

impl CredentialStore {
    /// Open (or create) the store rooted at `data_dir`, loading any
    /// previously persisted pair.
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        let path = data_dir.join(CREDENTIALS_FILE);

        let current = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read credentials file")?;
            match serde_json::from_str::<StoredPair>(&contents) {
                Ok(stored) => stored.into_pair(),
                Err(err) => {
                    debug!(error = %err, "Unreadable credentials file, treating as logged out");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    /// Persist a new pair, replacing any previous one whole.
    pub fn save(&self, pair: CredentialPair) -> Result<()> {
        let stored = StoredPair {
            access: Some(pair.access.clone()),
            refresh: Some(pair.refresh.clone()),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents).context("Failed to write credentials file")?;

        let mut current = self.lock();
        *current = Some(pair);
        Ok(())
    }

    /// Forget the pair. Safe to call when already empty.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
        }
        let mut current = self.lock();
        *current = None;
        Ok(())
    }

    /// Current access token, if logged in.
    pub fn access(&self) -> Option<String> {
        self.lock().as_ref().map(|pair| pair.access.clone())
    }

    /// Current refresh token, if logged in.
    pub fn refresh(&self) -> Option<String> {
        self.lock().as_ref().map(|pair| pair.refresh.clone())
    }

    /// Current pair, if logged in.
    pub fn pair(&self) -> Option<CredentialPair> {
        self.lock().clone()
    }

    /// True iff an access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CredentialPair>> {
        // Writers never panic while holding the lock
        self.current.lock().expect("credential store lock poisoned")
    }
}
