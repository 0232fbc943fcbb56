//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{Email, NewUser, User, UserId, UserName};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// The store did not answer within the configured query timeout.
        Timeout { message: String } => "user repository timed out: {message}",
        /// Another account already uses the email address.
        DuplicateEmail => "email address already registered",
    }
}

/// Port for account persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account and return it with its assigned identifier.
    ///
    /// Fails with [`UserPersistenceError::DuplicateEmail`] when the email is
    /// taken, including when a concurrent insert wins the race.
    async fn insert(&self, user: &NewUser) -> Result<User, UserPersistenceError>;

    /// Fetch a user by exact, case-sensitive email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Replace the display name, returning the updated record if it exists.
    async fn update_name(
        &self,
        id: UserId,
        name: &UserName,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Delete the account and every expense it owns.
    ///
    /// Returns `false` when no account matched.
    async fn delete(&self, id: UserId) -> Result<bool, UserPersistenceError>;
}
