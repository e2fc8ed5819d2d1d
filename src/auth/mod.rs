//! Session and credential management.
//!
//! This module provides:
//! - `CredentialStore`: durable persistence for the access/refresh pair
//! - `RefreshCoordinator`: single-flight exchange of the refresh token for
//!   a new pair, shared by every request that hits a 401 concurrently
//!
//! The credential pair is persisted to disk and survives restarts. There is
//! no client-side expiry bookkeeping; a pair is valid until the server says
//! otherwise.

pub mod refresh;
pub mod store;

pub use refresh::{RefreshCoordinator, RefreshError};
pub use store::{CredentialPair, CredentialStore};
