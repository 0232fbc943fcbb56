//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{expenses, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_digest: String,
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_digest: &'a str,
}

/// Changeset struct for renaming a user.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserNameUpdate<'a> {
    pub name: &'a str,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the expenses table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ExpenseRow {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub currency: String,
}

/// Insertable struct for creating expenses.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = expenses)]
pub(crate) struct NewExpenseRow<'a> {
    pub user_id: i64,
    pub amount: Decimal,
    pub description: &'a str,
    pub category: &'a str,
    pub date: NaiveDate,
    pub currency: &'a str,
}

/// Changeset struct overwriting every mutable expense column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = expenses)]
pub(crate) struct ExpenseUpdate<'a> {
    pub amount: Decimal,
    pub description: &'a str,
    pub category: &'a str,
    pub date: NaiveDate,
    pub currency: &'a str,
    pub updated_at: DateTime<Utc>,
}
