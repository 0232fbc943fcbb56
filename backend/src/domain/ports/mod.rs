//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod expense_repository;
mod login_service;
mod user_repository;

#[cfg(test)]
pub use expense_repository::MockExpenseRepository;
pub use expense_repository::{ExpensePersistenceError, ExpenseRepository};
pub use login_service::{LoginResponse, LoginService};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};

#[cfg(test)]
mod tests;
