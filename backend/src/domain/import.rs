//! Idempotent batch import of accounts and their expenses.
//!
//! The importer only drives [`AccountManager`] and [`ExpenseLedger`]; it adds
//! no persistence path of its own. Accounts whose email is already
//! registered are skipped together with their expenses, so replaying a batch
//! changes nothing. An entry is validated in full before anything of it is
//! written. Store outages are retried with exponential backoff; a write that
//! timed out is not retried because it may already have been applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::ports::{ExpenseRepository, UserRepository};
use crate::domain::{
    AccountError, AccountManager, Error, ExpenseDraft, ExpenseLedger, ExpensePayload,
    LedgerError, RegistrationPayload, ValidationError,
};

/// Async sleeping abstraction so retry delays can be observed in tests.
#[async_trait]
pub trait ImportSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl ImportSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry budget for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per store call, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use expense_tracker::domain::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 5,
    ///     base_delay: Duration::from_millis(100),
    ///     max_delay: Duration::from_millis(250),
    /// };
    /// assert_eq!(policy.delay_after(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_after(2), Duration::from_millis(200));
    /// assert_eq!(policy.delay_after(3), Duration::from_millis(250));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}

/// One account to create and the expenses to record for it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportEntry {
    /// Registration fields for the account.
    pub user: RegistrationPayload,
    /// Expenses owned by the account once created.
    #[serde(default)]
    pub expenses: Vec<ExpensePayload>,
}

/// Ordered collection of entries to import.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportBatch {
    /// Entries processed in order.
    pub entries: Vec<ImportEntry>,
}

/// Counts produced by a completed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Accounts created by this run.
    pub users_created: usize,
    /// Accounts skipped because the email was already registered.
    pub users_skipped: usize,
    /// Expenses recorded by this run.
    pub expenses_created: usize,
}

/// Failures that stop an import.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// An entry's account or one of its expenses was rejected.
    #[error("import entry {index} is invalid")]
    InvalidEntry {
        /// Position of the entry in the batch.
        index: usize,
        /// Rejected fields.
        #[source]
        source: ValidationError,
    },
    /// The store stayed unavailable after every retry.
    #[error("store unavailable while importing entry {index}: {message}")]
    Unavailable {
        /// Position of the entry in the batch.
        index: usize,
        /// Last store failure.
        message: String,
    },
    /// Any other failure.
    #[error("import failed at entry {index}: {message}")]
    Internal {
        /// Position of the entry in the batch.
        index: usize,
        /// Failure detail for logs.
        message: String,
    },
}

impl From<ImportError> for Error {
    fn from(value: ImportError) -> Self {
        match value {
            ImportError::InvalidEntry { index, source } => {
                let fields = Error::from(source).details().cloned();
                Error::invalid_request(format!("import entry {index} is invalid"))
                    .with_details(json!({ "entry": index, "fields": fields }))
            }
            ImportError::Unavailable { index, message } => {
                warn!(index, %message, "import aborted: store unavailable");
                Error::temporarily_unavailable()
            }
            ImportError::Internal { index, message } => {
                error!(index, %message, "import failed");
                Error::opaque_internal()
            }
        }
    }
}

/// Whether a store call may be repeated after a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Read,
    Write,
}

/// Service errors the importer knows how to classify.
trait ImportFailure: std::fmt::Display {
    fn is_transient(&self, step: Step) -> bool;
    fn into_import_error(self, index: usize) -> ImportError;
}

impl ImportFailure for AccountError {
    fn is_transient(&self, step: Step) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::TimedOut { .. } => step == Step::Read,
            _ => false,
        }
    }

    fn into_import_error(self, index: usize) -> ImportError {
        match self {
            Self::Validation(source) => ImportError::InvalidEntry { index, source },
            Self::Unavailable { message } | Self::TimedOut { message } => {
                ImportError::Unavailable { index, message }
            }
            other => ImportError::Internal {
                index,
                message: other.to_string(),
            },
        }
    }
}

impl ImportFailure for LedgerError {
    fn is_transient(&self, step: Step) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::TimedOut { .. } => step == Step::Read,
            _ => false,
        }
    }

    fn into_import_error(self, index: usize) -> ImportError {
        match self {
            Self::Validation(source) => ImportError::InvalidEntry { index, source },
            Self::Unavailable { message } | Self::TimedOut { message } => {
                ImportError::Unavailable { index, message }
            }
            other => ImportError::Internal {
                index,
                message: other.to_string(),
            },
        }
    }
}

/// Replays [`ImportBatch`]es through the account and expense services.
pub struct ExpenseImporter<U, E> {
    accounts: AccountManager<U>,
    ledger: ExpenseLedger<E>,
    policy: RetryPolicy,
    sleeper: Arc<dyn ImportSleeper>,
}

impl<U, E> ExpenseImporter<U, E>
where
    U: UserRepository,
    E: ExpenseRepository,
{
    /// Build an importer with the default retry policy and Tokio sleeps.
    pub fn new(accounts: AccountManager<U>, ledger: ExpenseLedger<E>) -> Self {
        Self {
            accounts,
            ledger,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the retry policy and sleeper.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy, sleeper: Arc<dyn ImportSleeper>) -> Self {
        self.policy = policy;
        self.sleeper = sleeper;
        self
    }

    /// Import every entry in order.
    ///
    /// Each entry is validated as a whole before its account is created.
    /// Entries before a failing one stay imported; re-running the batch
    /// after fixing it skips them and imports the rest.
    ///
    /// # Errors
    ///
    /// [`ImportError::InvalidEntry`] names the first rejected entry;
    /// [`ImportError::Unavailable`] means retries were exhausted.
    pub async fn import(&self, batch: &ImportBatch) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();
        for (index, entry) in batch.entries.iter().enumerate() {
            self.import_entry(index, entry, &mut report).await?;
        }
        info!(
            users_created = report.users_created,
            users_skipped = report.users_skipped,
            expenses_created = report.expenses_created,
            "import finished"
        );
        Ok(report)
    }

    async fn import_entry(
        &self,
        index: usize,
        entry: &ImportEntry,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let existing = self
            .retrying(index, Step::Read, || {
                self.accounts.find_by_email(&entry.user.email)
            })
            .await?;
        if existing.is_some() {
            report.users_skipped += 1;
            return Ok(());
        }

        let today = self.ledger.today();
        for expense in &entry.expenses {
            ExpenseDraft::for_create(expense, today)
                .map_err(|source| ImportError::InvalidEntry { index, source })?;
        }

        let user = self
            .retrying(index, Step::Write, || self.accounts.register(&entry.user))
            .await?;
        report.users_created += 1;

        for expense in &entry.expenses {
            self.retrying(index, Step::Write, || {
                self.ledger.create(user.id(), expense)
            })
            .await?;
            report.expenses_created += 1;
        }
        Ok(())
    }

    async fn retrying<T, F, Fut, Err>(
        &self,
        index: usize,
        step: Step,
        mut call: F,
    ) -> Result<T, ImportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Err>>,
        Err: ImportFailure,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient(step) && attempt < max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(index, attempt, delay_ms = delay.as_millis(), %error, "retrying import step");
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error.into_import_error(index)),
            }
        }
    }
}

#[cfg(test)]
mod tests;
