//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Deleting a user relies on the `ON DELETE CASCADE` foreign key from
//! `expenses.user_id`, so one statement removes the account and everything
//! it owns.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tokio::time::error::Elapsed;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{Email, NewUser, PasswordHash, User, UserId, UserName};

use super::diesel_basic_error_mapping::{
    is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{NewUserRow, UserNameUpdate, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the [`UserRepository`] port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn deadline_error(&self, _elapsed: Elapsed) -> UserPersistenceError {
        UserPersistenceError::timeout(format!(
            "no answer within {:?}",
            self.pool.query_timeout()
        ))
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    map_basic_pool_error(error, UserPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    if is_unique_violation(&error) {
        return UserPersistenceError::duplicate_email();
    }
    map_basic_diesel_error(
        error,
        UserPersistenceError::query,
        UserPersistenceError::connection,
    )
}

fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let email = Email::new(row.email)
        .map_err(|err| UserPersistenceError::query(format!("stored email invalid: {err}")))?;
    let name = UserName::new(row.name)
        .map_err(|err| UserPersistenceError::query(format!("stored name invalid: {err}")))?;
    Ok(User::new(
        UserId::new(row.id),
        email,
        name,
        PasswordHash::from_phc(row.password_digest),
    ))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, UserPersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row = diesel::insert_into(users::table)
                .values(&NewUserRow {
                    email: user.email.as_ref(),
                    name: user.name.as_ref(),
                    password_digest: user.password_hash.as_phc(),
                })
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            row_to_user(row)
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<UserRow> = users::table
                .filter(users::email.eq(email.as_ref()))
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_user).transpose()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<UserRow> = users::table
                .find(id.get())
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_user).transpose()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn update_name(
        &self,
        id: UserId,
        name: &UserName,
    ) -> Result<Option<User>, UserPersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<UserRow> = diesel::update(users::table.find(id.get()))
                .set(&UserNameUpdate {
                    name: name.as_ref(),
                    updated_at: Utc::now(),
                })
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_user).transpose()
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }

    async fn delete(&self, id: UserId) -> Result<bool, UserPersistenceError> {
        let work = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let deleted = diesel::delete(users::table.find(id.get()))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            Ok::<_, UserPersistenceError>(deleted > 0)
        };
        self.pool
            .with_deadline(work)
            .await
            .map_err(|elapsed| self.deadline_error(elapsed))?
    }
}
