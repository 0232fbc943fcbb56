//! Owner-scoped expense operations.
//!
//! The owner id passed to every method must come from an authenticated
//! identity; payloads never carry it.

use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{ExpensePersistenceError, ExpenseRepository};
use crate::domain::{
    Error, Expense, ExpenseDraft, ExpenseFilter, ExpenseId, ExpensePayload, ListFilterParams,
    UserId, ValidationError,
};

/// Failures raised by [`ExpenseLedger`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// One or more fields violate their constraints.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No expense with that id belongs to the caller.
    #[error("expense not found")]
    NotFound,
    /// The store could not be reached.
    #[error("expense store unavailable: {message}")]
    Unavailable { message: String },
    /// The store did not answer in time; a write may still have landed.
    #[error("expense store timed out: {message}")]
    TimedOut { message: String },
    /// Any other failure.
    #[error("expense operation failed: {message}")]
    Internal { message: String },
}

impl From<LedgerError> for Error {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Validation(err) => err.into(),
            LedgerError::NotFound => Error::not_found("expense not found"),
            LedgerError::Unavailable { message } | LedgerError::TimedOut { message } => {
                warn!(%message, "expense store unavailable");
                Error::temporarily_unavailable()
            }
            LedgerError::Internal { message } => {
                error!(%message, "expense operation failed");
                Error::opaque_internal()
            }
        }
    }
}

fn map_persistence_error(error: ExpensePersistenceError) -> LedgerError {
    debug!(%error, "expense repository error");
    match error {
        ExpensePersistenceError::Connection { message } => LedgerError::Unavailable { message },
        ExpensePersistenceError::Timeout { message } => LedgerError::TimedOut { message },
        ExpensePersistenceError::Query { message } => LedgerError::Internal { message },
    }
}

/// CRUD and date-filtered listing over a user's expenses.
pub struct ExpenseLedger<R> {
    expenses: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> Clone for ExpenseLedger<R> {
    fn clone(&self) -> Self {
        Self {
            expenses: Arc::clone(&self.expenses),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R> ExpenseLedger<R>
where
    R: ExpenseRepository,
{
    /// Create a ledger over an expense repository.
    pub fn new(expenses: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { expenses, clock }
    }

    /// Calendar date used for defaults and relative periods.
    pub fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    /// Record a new expense for `owner`, applying defaults first.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] lists every rejected field; nothing is
    /// stored in that case.
    pub async fn create(
        &self,
        owner: UserId,
        payload: &ExpensePayload,
    ) -> Result<Expense, LedgerError> {
        let draft = ExpenseDraft::for_create(payload, self.today())?;
        let expense = self
            .expenses
            .insert(owner, &draft)
            .await
            .map_err(map_persistence_error)?;
        info!(user_id = %owner, expense_id = %expense.id(), "expense created");
        Ok(expense)
    }

    /// Fetch one of `owner`'s expenses.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] both for missing ids and for expenses owned
    /// by someone else.
    pub async fn get(&self, owner: UserId, id: ExpenseId) -> Result<Expense, LedgerError> {
        self.expenses
            .find_owned(owner, id)
            .await
            .map_err(map_persistence_error)?
            .ok_or(LedgerError::NotFound)
    }

    /// Merge `payload` into an owned expense and revalidate the result.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] or [`LedgerError::Validation`].
    pub async fn update(
        &self,
        owner: UserId,
        id: ExpenseId,
        payload: &ExpensePayload,
    ) -> Result<Expense, LedgerError> {
        let existing = self.get(owner, id).await?;
        let draft = ExpenseDraft::merged(&existing, payload)?;
        let updated = self
            .expenses
            .update_owned(owner, id, &draft)
            .await
            .map_err(map_persistence_error)?
            .ok_or(LedgerError::NotFound)?;
        info!(user_id = %owner, expense_id = %id, "expense updated");
        Ok(updated)
    }

    /// Permanently remove an owned expense and return it.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] when the caller owns no such expense.
    pub async fn delete(&self, owner: UserId, id: ExpenseId) -> Result<Expense, LedgerError> {
        let removed = self
            .expenses
            .delete_owned(owner, id)
            .await
            .map_err(map_persistence_error)?
            .ok_or(LedgerError::NotFound)?;
        info!(user_id = %owner, expense_id = %id, "expense deleted");
        Ok(removed)
    }

    /// List `owner`'s expenses matching raw query parameters.
    ///
    /// # Errors
    ///
    /// Store failures only; unrecognised parameters simply do not filter.
    pub async fn list(
        &self,
        owner: UserId,
        params: &ListFilterParams,
    ) -> Result<Vec<Expense>, LedgerError> {
        self.list_filtered(owner, ExpenseFilter::from_params(params))
            .await
    }

    /// List `owner`'s expenses matching an interpreted filter, newest date
    /// first.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn list_filtered(
        &self,
        owner: UserId,
        filter: ExpenseFilter,
    ) -> Result<Vec<Expense>, LedgerError> {
        let window = filter.window(self.today());
        self.expenses
            .list_for_owner(owner, window)
            .await
            .map_err(map_persistence_error)
    }
}

#[cfg(test)]
#[path = "expense_ledger_tests.rs"]
mod tests;
