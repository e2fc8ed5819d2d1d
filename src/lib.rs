//! Taskdeck client library.
//!
//! This crate provides the client side of the Taskdeck task service:
//!
//! - `ApiClient`: authenticated REST client with transparent credential
//!   refresh and one-shot request replay on authentication failure
//! - `CredentialStore`: durable persistence for the access/refresh pair
//! - `models`: task and user domain types
//!
//! The API uses short-lived bearer access tokens paired with a longer-lived
//! refresh token. When a request comes back 401, the client refreshes the
//! pair (at most one refresh in flight process-wide, no matter how many
//! requests fail at once) and replays the original request exactly once.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialPair, CredentialStore};
pub use config::Config;
