//! Port for owner-scoped expense persistence.
//!
//! Every method takes the owning user id and applies it in the same lookup
//! as the expense id, so another user's row behaves exactly like a missing
//! one.

use async_trait::async_trait;

use crate::domain::{DateWindow, Expense, ExpenseDraft, ExpenseId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by expense repository adapters.
    pub enum ExpensePersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "expense repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "expense repository query failed: {message}",
        /// The store did not answer within the configured query timeout.
        Timeout { message: String } =>
            "expense repository timed out: {message}",
    }
}

/// Port for reading and writing a user's expenses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Persist a new expense for `owner`.
    async fn insert(
        &self,
        owner: UserId,
        draft: &ExpenseDraft,
    ) -> Result<Expense, ExpensePersistenceError>;

    /// Fetch an expense only if `owner` owns it.
    async fn find_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
    ) -> Result<Option<Expense>, ExpensePersistenceError>;

    /// Overwrite the mutable fields of an owned expense.
    async fn update_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
        draft: &ExpenseDraft,
    ) -> Result<Option<Expense>, ExpensePersistenceError>;

    /// Delete an owned expense, returning the removed record.
    async fn delete_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
    ) -> Result<Option<Expense>, ExpensePersistenceError>;

    /// List the owner's expenses inside `window`, newest date first and
    /// ties in insertion order.
    async fn list_for_owner(
        &self,
        owner: UserId,
        window: DateWindow,
    ) -> Result<Vec<Expense>, ExpensePersistenceError>;
}
