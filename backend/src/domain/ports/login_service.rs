//! Driving port for login use-cases.
//!
//! Inbound adapters call it to exchange credentials for a bearer token
//! without knowing the backing infrastructure, so adapter tests can swap in
//! a mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, LoginCredentials, UserPayload};

/// Successful login: `{token, user: {id, email, name}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent calls.
    pub token: String,
    /// The authenticated user.
    pub user: UserPayload,
}

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and issue a token.
    ///
    /// Every credential failure yields the same `unauthorized`
    /// "invalid credentials" error.
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, Error>;
}
