//! REST API client for the Taskdeck service.
//!
//! `ApiClient` attaches the bearer access token to every outgoing request,
//! and on a 401 refreshes the credential pair (single-flight, see
//! `crate::auth::refresh`) and replays the request once. An irrecoverable
//! refresh clears the persisted pair and surfaces `ApiError::SessionExpired`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
