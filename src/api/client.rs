//! REST API client with credential attachment and 401 recovery.
//!
//! Every request goes through `dispatch`: the current access token is
//! attached as a bearer header, and a 401 response triggers one refresh of
//! the credential pair (shared across concurrent failures, see
//! `RefreshCoordinator`) followed by a single replay. Login, register, and
//! refresh bypass that path; a 401 there is a credential problem for the
//! user, not a stale session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{CredentialPair, CredentialStore, RefreshCoordinator};
use crate::config::Config;
use crate::models::{NewTask, Task, TaskFilter, TaskPage, TaskPatch, TaskStatus, TokenPair, User};

use super::ApiError;

/// HTTP request timeout in seconds.
/// Matches the upstream service's own client deadline; exceeding it is a
/// network failure, not a distinct outcome.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How many times a request may be replayed after a 401.
/// One replay with a refreshed token; a second 401 is final.
const RETRY_BUDGET: u8 = 1;

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Called after an irrecoverable refresh, once the store is cleared.
/// Stands in for "navigate to the login page" in an embedding UI.
type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Per-request recovery state: the retry budget is decremented on each
/// 401, and recovery stops at zero.
struct RequestContext {
    retry_budget: u8,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// API client for the Taskdeck service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<CredentialStore>,
    refresher: RefreshCoordinator,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClient {
    /// Create a new API client against `config.base_url`, using `store`
    /// for credential persistence.
    pub fn new(config: &Config, store: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let refresher = RefreshCoordinator::new(
            http.clone(),
            format!("{}/v1/auth/refresh", config.base_url),
            store.clone(),
        );

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            store,
            refresher,
            on_session_expired: None,
        })
    }

    /// Register a callback to run when the session is irrecoverably lost.
    /// It fires after the store is cleared and before the error surfaces,
    /// so the callback always observes a logged-out store.
    pub fn on_session_expired(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// The credential store backing this client.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    // ===== Request dispatch and recovery =====

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request with the bearer token attached, recovering from a
    /// 401 by refreshing the pair and replaying once.
    async fn dispatch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&'static str, String)]>,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let mut ctx = RequestContext {
            retry_budget: RETRY_BUDGET,
        };

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            // Attach the current access token if one exists; absence is not
            // an error here, the server rejects if one was required
            if let Some(token) = self.store.access() {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if ctx.retry_budget == 0 {
                // Already replayed once; surface the 401 as-is
                debug!(path, "replayed request rejected again, giving up");
                return Err(ApiError::Unauthorized);
            }
            ctx.retry_budget -= 1;

            match self.refresher.refreshed_access().await {
                Ok(_) => {
                    // The store now holds the new pair; the replay re-reads it
                    debug!(path, "replaying request with refreshed credential");
                }
                Err(err) => {
                    warn!(error = %err, path, "session irrecoverable, logging out");
                    return Err(self.expire_session());
                }
            }
        }
    }

    /// End the session: clear the store, notify the embedder, and hand the
    /// caller `SessionExpired`. Strictly in that order.
    fn expire_session(&self) -> ApiError {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear credential store");
        }
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
        ApiError::SessionExpired
    }

    async fn expect_success(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|err| ApiError::InvalidResponse(format!("failed to parse body: {err}")))
    }

    // ===== Auth endpoints (never intercepted) =====

    /// Exchange username and password for a credential pair and persist it.
    ///
    /// A rejection here surfaces as `AuthFailed` and leaves any persisted
    /// session untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "username and password are required".to_string(),
            ));
        }

        let response = self
            .http
            .post(self.url("/v1/auth/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status.as_u16() {
                400 | 401 | 403 => Err(ApiError::AuthFailed(if body.is_empty() {
                    "invalid username or password".to_string()
                } else {
                    body
                })),
                _ => Err(ApiError::from_status(status, &body)),
            };
        }

        let tokens: TokenPair = Self::parse_json(response).await?;
        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "login response missing token fields".to_string(),
            ));
        }

        self.store
            .save(CredentialPair {
                access: tokens.access_token.clone(),
                refresh: tokens.refresh_token.clone(),
            })
            .map_err(|err| ApiError::Storage(err.to_string()))?;

        debug!(username, "logged in");
        Ok(tokens)
    }

    /// Create an account. Does not establish a session; callers log in
    /// afterwards. Field checks run before anything touches the network.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        if username.trim().is_empty() || email.trim().is_empty() {
            return Err(ApiError::Validation(
                "username and email are required".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let response = self
            .http
            .post(self.url("/v1/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status.as_u16() {
                400 | 409 | 422 => Err(ApiError::AuthFailed(body)),
                _ => Err(ApiError::from_status(status, &body)),
            };
        }

        Self::parse_json(response).await
    }

    /// Notify the server, then drop the pair locally. The notification is
    /// best-effort: the local session always ends.
    pub async fn logout(&self) -> Result<(), ApiError> {
        match self
            .dispatch(Method::POST, "/v1/auth/logout", None, None::<&serde_json::Value>)
            .await
        {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "logout notification rejected")
            }
            Err(err) => warn!(error = %err, "logout notification failed"),
        }

        self.store
            .clear()
            .map_err(|err| ApiError::Storage(err.to_string()))?;
        debug!("logged out");
        Ok(())
    }

    /// True iff a credential pair is persisted. The session is a client-side
    /// belief; the server may still reject the tokens.
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    // ===== Task endpoints =====

    /// List tasks matching `filter`.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<TaskPage, ApiError> {
        let query = filter.to_query();
        let response = self
            .dispatch(
                Method::GET,
                "/v1/tasks",
                Some(&query),
                None::<&serde_json::Value>,
            )
            .await?;
        let response = Self::expect_success(response).await?;
        Self::parse_json(response).await
    }

    /// Fetch a single task by id.
    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        let path = format!("/v1/tasks/{id}");
        let response = self
            .dispatch(Method::GET, &path, None, None::<&serde_json::Value>)
            .await?;
        let response = Self::expect_success(response).await?;
        let envelope: DataEnvelope<Task> = Self::parse_json(response).await?;
        Ok(envelope.data)
    }

    /// Create a task.
    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        if task.title.trim().is_empty() {
            return Err(ApiError::Validation("title is required".to_string()));
        }
        let response = self
            .dispatch(Method::POST, "/v1/tasks", None, Some(task))
            .await?;
        let response = Self::expect_success(response).await?;
        let envelope: DataEnvelope<Task> = Self::parse_json(response).await?;
        Ok(envelope.data)
    }

    /// Update a task in place; unset patch fields are left unchanged.
    pub async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Task, ApiError> {
        let path = format!("/v1/tasks/{id}");
        let response = self.dispatch(Method::PUT, &path, None, Some(patch)).await?;
        let response = Self::expect_success(response).await?;
        let envelope: DataEnvelope<Task> = Self::parse_json(response).await?;
        Ok(envelope.data)
    }

    /// Set just the workflow status of a task.
    pub async fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<(), ApiError> {
        let path = format!("/v1/tasks/{id}/status");
        let response = self
            .dispatch(
                Method::PATCH,
                &path,
                None,
                Some(&serde_json::json!({ "status": status })),
            )
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/v1/tasks/{id}");
        let response = self
            .dispatch(Method::DELETE, &path, None, None::<&serde_json::Value>)
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }
}
