use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Client-side field check failed; nothing was sent to the server.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server rejected the supplied login/registration credentials.
    /// The persisted session, if any, is unaffected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The credential pair could not be refreshed. The store has been
    /// cleared; the user must log in again.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// 401 on a request that had already used its replay. No further
    /// recovery is attempted.
    #[error("unauthorized")]
    Unauthorized,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The credential file could not be read or written.
    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data in errors
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AuthFailed(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("status {}: {}", status, truncated)),
        }
    }
}
