//! Single-flight refresh of the credential pair.
//!
//! When several requests hit a 401 at the same time, only one refresh call
//! may go upstream; every caller waits on the same in-flight exchange and
//! observes the same outcome. The in-flight operation lives in a
//! mutex-guarded slot as a shared future: the first caller installs it,
//! later callers clone the handle, and the operation empties the slot
//! before it resolves so a caller that retries afterwards always starts a
//! fresh attempt instead of re-joining a settled one.

use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::TokenPair;

use super::store::{CredentialPair, CredentialStore};

/// Why a refresh attempt produced no new credential.
///
/// Cloneable because every waiter on the shared in-flight operation
/// receives its own copy of the outcome.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// No refresh token in the store; the exchange was never attempted.
    #[error("no refresh credential available")]
    NoRefreshCredential,
    /// The exchange failed: network error, non-2xx, or a malformed body.
    #[error("credential refresh failed: {0}")]
    RefreshFailed(String),
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// Serializes refresh attempts so N concurrently-failing requests produce
/// exactly one upstream call.
#[derive(Clone)]
pub struct RefreshCoordinator {
    http: Client,
    refresh_url: String,
    store: Arc<CredentialStore>,
    in_flight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new(http: Client, refresh_url: String, store: Arc<CredentialStore>) -> Self {
        Self {
            http,
            refresh_url,
            store,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Obtain a fresh access token, joining the in-flight refresh if one
    /// exists. On success the store already holds the new pair.
    pub async fn refreshed_access(&self) -> Result<String, RefreshError> {
        let operation = {
            let mut slot = self.lock_slot();
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!("joining in-flight credential refresh");
                    in_flight.clone()
                }
                None => {
                    let operation = Self::run(
                        self.http.clone(),
                        self.refresh_url.clone(),
                        self.store.clone(),
                        self.in_flight.clone(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(operation.clone());
                    operation
                }
            }
        };

        operation.await
    }

    /// Drive one exchange to completion, then empty the slot. The slot is
    /// cleared before this future resolves, so waiters are only notified
    /// once a new attempt is possible.
    async fn run(
        http: Client,
        refresh_url: String,
        store: Arc<CredentialStore>,
        in_flight: Arc<Mutex<Option<SharedRefresh>>>,
    ) -> Result<String, RefreshError> {
        let result = Self::exchange(http, refresh_url, store).await;
        *in_flight.lock().expect("refresh slot lock poisoned") = None;
        if let Err(ref err) = result {
            warn!(error = %err, "credential refresh failed");
        }
        result
    }

    async fn exchange(
        http: Client,
        refresh_url: String,
        store: Arc<CredentialStore>,
    ) -> Result<String, RefreshError> {
        let refresh_token = store.refresh().ok_or(RefreshError::NoRefreshCredential)?;

        debug!("exchanging refresh token for a new credential pair");
        let response = http
            .post(&refresh_url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|err| RefreshError::RefreshFailed(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(RefreshError::RefreshFailed(format!(
                "refresh endpoint returned {}",
                response.status()
            )));
        }

        // A 2xx with missing or empty token fields is a failure, not a pair
        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|err| RefreshError::RefreshFailed(format!("malformed token response: {err}")))?;
        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err(RefreshError::RefreshFailed(
                "malformed token response: empty token field".to_string(),
            ));
        }

        store
            .save(CredentialPair {
                access: tokens.access_token.clone(),
                refresh: tokens.refresh_token,
            })
            .map_err(|err| RefreshError::RefreshFailed(format!("failed to persist pair: {err}")))?;

        debug!("credential pair refreshed");
        Ok(tokens.access_token)
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<SharedRefresh>> {
        self.in_flight.lock().expect("refresh slot lock poisoned")
    }
}
