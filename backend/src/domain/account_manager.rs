//! Account registration, authentication and maintenance.
//!
//! Password hashing and verification are CPU-bound, so they run on Tokio's
//! blocking pool rather than on the async workers.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::domain::credentials::CredentialStore;
use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{
    Email, Error, INVALID_CREDENTIALS, LoginCredentials, NewUser, Registration,
    RegistrationPayload, User, UserId, UserName, ValidationError,
};

/// Field message for an email that belongs to another account.
pub const EMAIL_TAKEN: &str = "already in use";

/// Failures raised by [`AccountManager`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// One or more fields violate their constraints.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// No account has the requested id.
    #[error("account not found")]
    NotFound,
    /// The store could not be reached.
    #[error("account store unavailable: {message}")]
    Unavailable { message: String },
    /// The store did not answer in time; a write may still have landed.
    #[error("account store timed out: {message}")]
    TimedOut { message: String },
    /// Any other failure.
    #[error("account operation failed: {message}")]
    Internal { message: String },
}

impl From<AccountError> for Error {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::Validation(err) => err.into(),
            AccountError::InvalidCredentials => Error::unauthorized(INVALID_CREDENTIALS),
            AccountError::NotFound => Error::not_found("account not found"),
            AccountError::Unavailable { message } | AccountError::TimedOut { message } => {
                warn!(%message, "account store unavailable");
                Error::temporarily_unavailable()
            }
            AccountError::Internal { message } => {
                error!(%message, "account operation failed");
                Error::opaque_internal()
            }
        }
    }
}

fn map_persistence_error(error: UserPersistenceError) -> AccountError {
    debug!(%error, "user repository error");
    match error {
        UserPersistenceError::Connection { message } => AccountError::Unavailable { message },
        UserPersistenceError::Timeout { message } => AccountError::TimedOut { message },
        UserPersistenceError::Query { message } => AccountError::Internal { message },
        UserPersistenceError::DuplicateEmail => {
            AccountError::Validation(ValidationError::single("email", EMAIL_TAKEN))
        }
    }
}

/// Creates and looks up user identities.
pub struct AccountManager<R> {
    users: Arc<R>,
    credentials: Arc<dyn CredentialStore>,
}

impl<R> Clone for AccountManager<R> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            credentials: Arc::clone(&self.credentials),
        }
    }
}

impl<R> AccountManager<R>
where
    R: UserRepository,
{
    /// Create a manager over a user repository and a credential store.
    pub fn new(users: Arc<R>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { users, credentials }
    }

    /// Register a new account.
    ///
    /// Every field violation is reported together, including
    /// `email: "already in use"` when the address is registered.
    ///
    /// # Errors
    ///
    /// [`AccountError::Validation`] for rejected fields; store failures map
    /// to [`AccountError::Unavailable`], [`AccountError::TimedOut`] or
    /// [`AccountError::Internal`].
    pub async fn register(&self, payload: &RegistrationPayload) -> Result<User, AccountError> {
        let validated = Registration::validate(payload);
        let taken = match Email::new(payload.email.as_str()) {
            Ok(email) => self.email_registered(&email).await?,
            Err(_) => false,
        };

        let registration = match (validated, taken) {
            (Ok(registration), false) => registration,
            (Ok(_), true) => {
                return Err(ValidationError::single("email", EMAIL_TAKEN).into());
            }
            (Err(err), true) => return Err(err.with("email", EMAIL_TAKEN).into()),
            (Err(err), false) => return Err(err.into()),
        };

        let password = registration.password().clone();
        let password_hash = self
            .blocking(move |store| store.hash(password.expose()))
            .await?
            .map_err(|err| AccountError::Internal {
                message: err.to_string(),
            })?;

        let user = self
            .users
            .insert(&NewUser {
                email: registration.email().clone(),
                name: registration.name().clone(),
                password_hash,
            })
            .await
            .map_err(map_persistence_error)?;

        info!(user_id = %user.id(), "account registered");
        Ok(user)
    }

    /// Verify credentials and return the matching account.
    ///
    /// An unknown or malformed email still costs one dummy verification, so
    /// both failure paths look the same from outside.
    ///
    /// # Errors
    ///
    /// [`AccountError::InvalidCredentials`] for any credential mismatch.
    pub async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, AccountError> {
        let candidate = match Email::new(credentials.email()) {
            Ok(email) => self
                .users
                .find_by_email(&email)
                .await
                .map_err(map_persistence_error)?,
            Err(_) => None,
        };

        let password = Zeroizing::new(credentials.password().to_owned());
        let Some(user) = candidate else {
            self.blocking(move |store| store.verify_dummy(password.as_str()))
                .await?;
            warn!("login rejected");
            return Err(AccountError::InvalidCredentials);
        };

        let hash = user.password_hash().clone();
        let matched = self
            .blocking(move |store| store.verify(password.as_str(), &hash))
            .await?;
        if !matched {
            warn!("login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %user.id(), "login succeeded");
        Ok(user)
    }

    /// Look up an account by id.
    ///
    /// # Errors
    ///
    /// Store failures only; a missing account is `Ok(None)`.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AccountError> {
        self.users
            .find_by_id(id)
            .await
            .map_err(map_persistence_error)
    }

    /// Look up an account by exact email.
    ///
    /// # Errors
    ///
    /// Store failures only; an unknown or malformed email is `Ok(None)`.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let Ok(email) = Email::new(email) else {
            return Ok(None);
        };
        self.users
            .find_by_email(&email)
            .await
            .map_err(map_persistence_error)
    }

    /// Change the display name, the only mutable account field.
    ///
    /// # Errors
    ///
    /// [`AccountError::Validation`] for a rejected name and
    /// [`AccountError::NotFound`] when the account is gone.
    pub async fn rename(&self, id: UserId, name: &str) -> Result<User, AccountError> {
        let name = UserName::new(name)
            .map_err(|err| ValidationError::single("name", err.to_string()))?;
        self.users
            .update_name(id, &name)
            .await
            .map_err(map_persistence_error)?
            .ok_or(AccountError::NotFound)
    }

    /// Delete an account together with every expense it owns.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotFound`] when no account has `id`.
    pub async fn delete_account(&self, id: UserId) -> Result<(), AccountError> {
        let deleted = self
            .users
            .delete(id)
            .await
            .map_err(map_persistence_error)?;
        if !deleted {
            return Err(AccountError::NotFound);
        }
        info!(user_id = %id, "account deleted");
        Ok(())
    }

    async fn email_registered(&self, email: &Email) -> Result<bool, AccountError> {
        self.users
            .find_by_email(email)
            .await
            .map(|found| found.is_some())
            .map_err(map_persistence_error)
    }

    async fn blocking<T, F>(&self, task: F) -> Result<T, AccountError>
    where
        F: FnOnce(&dyn CredentialStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.credentials);
        tokio::task::spawn_blocking(move || task(store.as_ref()))
            .await
            .map_err(|err| AccountError::Internal {
                message: format!("credential task failed: {err}"),
            })
    }
}

#[cfg(test)]
#[path = "account_manager_tests.rs"]
mod tests;
