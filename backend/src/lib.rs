//! Expense tracker core: identities, bearer tokens and owner-scoped expenses.

pub mod cap_fs;
pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
