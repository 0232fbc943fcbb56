//! PostgreSQL-backed `ExpenseRepository` implementation using Diesel ORM.
//!
//! The owner filter is part of every statement's `WHERE` clause, never a
//! check performed after loading the row.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tokio::time::error::Elapsed;

use crate::domain::ports::{ExpensePersistenceError, ExpenseRepository};
use crate::domain::{
    Amount, Category, Currency, DateWindow, Description, Expense, ExpenseDraft, ExpenseId, UserId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{ExpenseRow, ExpenseUpdate, NewExpenseRow};
use super::pool::{DbPool, PoolError};
use super::schema::expenses;

/// Diesel-backed implementation of the [`ExpenseRepository`] port.
#[derive(Clone)]
pub struct DieselExpenseRepository {
    pool: DbPool,
}

impl DieselExpenseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn deadline_error(&self, _elapsed: Elapsed) -> ExpensePersistenceError {
        ExpensePersistenceError::timeout(format!(
            "no answer within {:?}",
            self.pool.query_timeout()
        ))
    }
}

fn map_pool_error(error: PoolError) -> ExpensePersistenceError {
    map_basic_pool_error(error, ExpensePersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ExpensePersistenceError {
    map_basic_diesel_error(
        error,
        ExpensePersistenceError::query,
        ExpensePersistenceError::connection,
    )
}

fn corrupt(field: &str, detail: impl std::fmt::Display) -> ExpensePersistenceError {
    ExpensePersistenceError::query(format!("stored {field} invalid: {detail}"))
}

fn row_to_expense(row: ExpenseRow) -> Result<Expense, ExpensePersistenceError> {
    let draft = ExpenseDraft {
        amount: Amount::new(row.amount).map_err(|err| corrupt("amount", err))?,
        description: Description::new(row.description)
            .map_err(|err| corrupt("description", err))?,
        category: Category::from_str(&row.category).map_err(|err| corrupt("category", err))?,
        date: row.date,
        currency: Currency::new(row.currency).map_err(|err| corrupt("currency", err))?,
    };
    Ok(Expense::new(
        ExpenseId::new(row.id),
        UserId::new(row.user_id),
        draft,
    ))
}

fn changeset(draft: &ExpenseDraft) -> ExpenseUpdate<'_> {
    ExpenseUpdate {
        amount: draft.amount.value(),
        description: draft.description.as_ref(),
        category: draft.category.as_str(),
        date: draft.date,
        currency: draft.currency.as_ref(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl ExpenseRepository for DieselExpenseRepository {
    async fn insert(
        &self,
        owner: UserId,
        draft: &ExpenseDraft,
    ) -> Result<Expense, ExpensePersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row = diesel::insert_into(expenses::table)
                .values(&NewExpenseRow {
                    user_id: owner.get(),
                    amount: draft.amount.value(),
                    description: draft.description.as_ref(),
                    category: draft.category.as_str(),
                    date: draft.date,
                    currency: draft.currency.as_ref(),
                })
                .returning(ExpenseRow::as_returning())
                .get_result(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            row_to_expense(row)
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn find_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
    ) -> Result<Option<Expense>, ExpensePersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<ExpenseRow> = expenses::table
                .filter(expenses::id.eq(id.get()))
                .filter(expenses::user_id.eq(owner.get()))
                .select(ExpenseRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_expense).transpose()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn update_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
        draft: &ExpenseDraft,
    ) -> Result<Option<Expense>, ExpensePersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<ExpenseRow> = conn
                .transaction(|conn| {
                    async move {
                        diesel::update(
                            expenses::table
                                .filter(expenses::id.eq(id.get()))
                                .filter(expenses::user_id.eq(owner.get())),
                        )
                        .set(&changeset(draft))
                        .returning(ExpenseRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()
                    }
                    .scope_boxed()
                })
                .await
                .map_err(map_diesel_error)?;
            row.map(row_to_expense).transpose()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn delete_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
    ) -> Result<Option<Expense>, ExpensePersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<ExpenseRow> = conn
                .transaction(|conn| {
                    async move {
                        diesel::delete(
                            expenses::table
                                .filter(expenses::id.eq(id.get()))
                                .filter(expenses::user_id.eq(owner.get())),
                        )
                        .returning(ExpenseRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()
                    }
                    .scope_boxed()
                })
                .await
                .map_err(map_diesel_error)?;
            row.map(row_to_expense).transpose()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn list_for_owner(
        &self,
        owner: UserId,
        window: DateWindow,
    ) -> Result<Vec<Expense>, ExpensePersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let mut query = expenses::table
                .filter(expenses::user_id.eq(owner.get()))
                .into_boxed();
            if let Some(from) = window.from {
                query = query.filter(expenses::date.ge(from));
            }
            if let Some(to) = window.to {
                query = query.filter(expenses::date.le(to));
            }
            let rows: Vec<ExpenseRow> = query
                .order((expenses::date.desc(), expenses::id.asc()))
                .select(ExpenseRow::as_select())
                .load(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_expense).collect()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }
}
