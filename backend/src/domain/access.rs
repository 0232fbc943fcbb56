//! Token-gated access to the expense ledger.
//!
//! Every ledger call made on behalf of a caller resolves the caller's token
//! first, and the resolved user id is the only owner id ever passed on.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::ports::{ExpenseRepository, UserRepository};
use crate::domain::{
    AccountError, AccountManager, Error, ExpenseId, ExpenseLedger, ExpensePayload, ExpenseView,
    ListFilterParams, TokenError, TokenService, User,
};

/// Extract the credential from an `Authorization: Bearer <token>` value.
///
/// # Examples
/// ```
/// use expense_tracker::domain::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(bearer_token("Bearer   "), None);
/// assert_eq!(bearer_token("Basic dXNlcg=="), None);
/// ```
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Reasons a caller cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("no bearer token presented")]
    MissingToken,
    /// The token failed verification.
    #[error("token rejected: {0}")]
    Unauthenticated(#[source] TokenError),
    /// The token is genuine but its subject no longer exists.
    #[error("token subject no longer exists")]
    ResourceGone,
    /// The account store could not be reached in time.
    #[error("account store unavailable: {message}")]
    Unavailable { message: String },
    /// Any other failure while resolving the subject.
    #[error("failed to resolve token subject: {message}")]
    Internal { message: String },
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingToken | AuthError::Unauthenticated(_) | AuthError::ResourceGone => {
                Error::authentication_required()
            }
            AuthError::Unavailable { message } => {
                warn!(%message, "account store unavailable during authorization");
                Error::temporarily_unavailable()
            }
            AuthError::Internal { message } => {
                error!(%message, "authorization failed");
                Error::opaque_internal()
            }
        }
    }
}

impl From<AccountError> for AuthError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::Unavailable { message } | AccountError::TimedOut { message } => {
                Self::Unavailable { message }
            }
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Resolves bearer tokens and scopes ledger operations to their subject.
pub struct AccessMediator<U, E> {
    accounts: AccountManager<U>,
    ledger: ExpenseLedger<E>,
    tokens: Arc<TokenService>,
}

impl<U, E> AccessMediator<U, E>
where
    U: UserRepository,
    E: ExpenseRepository,
{
    /// Wire the mediator to its collaborators.
    pub fn new(
        accounts: AccountManager<U>,
        ledger: ExpenseLedger<E>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            tokens,
        }
    }

    /// Resolve a bare token to a live user.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] for a bad token and
    /// [`AuthError::ResourceGone`] when its subject was deleted.
    pub async fn authorize(&self, token: &str) -> Result<User, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let user_id = self.tokens.verify(token).map_err(|err| {
            debug!(reason = %err, "bearer token rejected");
            AuthError::Unauthenticated(err)
        })?;
        self.accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id = %user_id, "token subject no longer exists");
                AuthError::ResourceGone
            })
    }

    /// Resolve an `Authorization` header value to a live user.
    ///
    /// # Errors
    ///
    /// As [`AccessMediator::authorize`], plus [`AuthError::MissingToken`]
    /// when the header is absent or not a bearer credential.
    pub async fn authorize_header(&self, header_value: Option<&str>) -> Result<User, AuthError> {
        let token = header_value
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;
        self.authorize(token).await
    }

    /// Create an expense owned by the token's subject.
    ///
    /// # Errors
    ///
    /// Authentication failures collapse to `unauthorized`; validation errors
    /// carry the field map.
    pub async fn create_expense(
        &self,
        token: &str,
        payload: &ExpensePayload,
    ) -> Result<ExpenseView, Error> {
        let caller = self.authorize(token).await?;
        let expense = self.ledger.create(caller.id(), payload).await?;
        Ok(expense.into())
    }

    /// Fetch one of the caller's expenses.
    ///
    /// # Errors
    ///
    /// `not_found` for both missing and foreign expenses.
    pub async fn get_expense(&self, token: &str, id: ExpenseId) -> Result<ExpenseView, Error> {
        let caller = self.authorize(token).await?;
        let expense = self.ledger.get(caller.id(), id).await?;
        Ok(expense.into())
    }

    /// Update one of the caller's expenses.
    ///
    /// # Errors
    ///
    /// As [`AccessMediator::get_expense`], plus validation failures.
    pub async fn update_expense(
        &self,
        token: &str,
        id: ExpenseId,
        payload: &ExpensePayload,
    ) -> Result<ExpenseView, Error> {
        let caller = self.authorize(token).await?;
        let expense = self.ledger.update(caller.id(), id, payload).await?;
        Ok(expense.into())
    }

    /// Delete one of the caller's expenses.
    ///
    /// # Errors
    ///
    /// As [`AccessMediator::get_expense`].
    pub async fn delete_expense(&self, token: &str, id: ExpenseId) -> Result<ExpenseView, Error> {
        let caller = self.authorize(token).await?;
        let expense = self.ledger.delete(caller.id(), id).await?;
        Ok(expense.into())
    }

    /// List the caller's expenses matching `params`.
    ///
    /// # Errors
    ///
    /// Authentication and store failures only.
    pub async fn list_expenses(
        &self,
        token: &str,
        params: &ListFilterParams,
    ) -> Result<Vec<ExpenseView>, Error> {
        let caller = self.authorize(token).await?;
        let expenses = self.ledger.list(caller.id(), params).await?;
        Ok(expenses.into_iter().map(ExpenseView::from).collect())
    }

    /// Delete the caller's account and every expense it owns.
    ///
    /// # Errors
    ///
    /// Authentication and store failures only.
    pub async fn delete_account(&self, token: &str) -> Result<(), Error> {
        let caller = self.authorize(token).await?;
        self.accounts.delete_account(caller.id()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "access_tests.rs"]
mod tests;
