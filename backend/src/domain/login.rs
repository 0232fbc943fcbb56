//! Password login: authenticate, then mint a bearer token.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{LoginResponse, LoginService, UserRepository};
use crate::domain::{AccountManager, Error, LoginCredentials, TokenService};

/// [`LoginService`] backed by the account manager and token service.
pub struct PasswordLoginService<R> {
    accounts: AccountManager<R>,
    tokens: Arc<TokenService>,
}

impl<R> PasswordLoginService<R> {
    /// Wire the service to its collaborators.
    pub fn new(accounts: AccountManager<R>, tokens: Arc<TokenService>) -> Self {
        Self { accounts, tokens }
    }
}

#[async_trait]
impl<R> LoginService for PasswordLoginService<R>
where
    R: UserRepository,
{
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, Error> {
        let user = self.accounts.authenticate(credentials).await?;
        let token = self.tokens.issue(user.id())?;
        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }
}
