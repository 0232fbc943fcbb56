//! Domain primitives, services and ports.
//!
//! Purpose: define strongly typed identities, credentials and expenses, and
//! the services that enforce their invariants. Adapters reach storage only
//! through the traits in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) — transport-agnostic failure payload.
//! - AccountManager — registration, authentication and account upkeep.
//! - TokenService — stateless bearer token issue and verification.
//! - ExpenseLedger — owner-scoped expense CRUD and date filtering.
//! - AccessMediator — resolves tokens before any ledger call.

mod access;
mod account_manager;
mod auth;
mod credentials;
pub mod error;
mod expense;
mod expense_filter;
mod expense_ledger;
mod import;
mod login;
pub mod ports;
mod token;
pub mod user;
mod validation;

pub use self::access::{AccessMediator, AuthError, bearer_token};
pub use self::account_manager::{AccountError, AccountManager, EMAIL_TAKEN};
pub use self::auth::{
    LoginCredentials, PASSWORD_MAX, PASSWORD_MIN, Password, PasswordValidationError, Registration,
    RegistrationPayload,
};
pub use self::credentials::{Argon2CredentialStore, CredentialError, CredentialStore, HashingCost};
pub use self::error::{
    AUTHENTICATION_REQUIRED, Error, ErrorCode, ErrorValidationError, INTERNAL_FAILURE,
    INVALID_CREDENTIALS, TEMPORARILY_UNAVAILABLE,
};
pub use self::expense::{
    AMOUNT_MAX, Amount, Category, Currency, DEFAULT_CURRENCY, DESCRIPTION_MAX, Description,
    Expense, ExpenseDraft, ExpenseId, ExpensePayload, ExpenseValidationError, ExpenseView,
};
pub use self::expense_filter::{
    DateWindow, ExpenseFilter, ListFilterParams, Period, UnknownPeriod,
};
pub use self::expense_ledger::{ExpenseLedger, LedgerError};
pub use self::import::{
    ExpenseImporter, ImportBatch, ImportEntry, ImportError, ImportReport, ImportSleeper,
    RetryPolicy, TokioSleeper,
};
pub use self::login::PasswordLoginService;
pub use self::token::{
    BuildMode, DEFAULT_ISSUER, DEFAULT_TTL_HOURS, TokenClaims, TokenConfigError, TokenError,
    TokenService, TokenSettings, key_fingerprint, token_settings_from_env,
};
pub use self::user::{
    EMAIL_MAX, Email, NAME_MAX, NewUser, PasswordHash, User, UserId, UserName, UserPayload,
    UserValidationError,
};
pub use self::validation::{BLANK, FieldErrors, ValidationError};
