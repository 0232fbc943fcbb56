//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the domain repository
//! ports backed by PostgreSQL via Diesel with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repository implementations only translate between
//!   Diesel rows and domain types. Validation lives in the domain services.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) never leave this module.
//! - **Bounded calls**: every repository operation runs under the pool's
//!   query deadline and reports `Timeout` when it passes.
//!
//! # Example
//!
//! ```ignore
//! use expense_tracker::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/expenses")).await?;
//! let users = DieselUserRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_expense_repository;
mod diesel_user_repository;
mod models;
mod pool;
mod schema;

pub use diesel_expense_repository::DieselExpenseRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
