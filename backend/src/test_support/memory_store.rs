//! In-memory implementation of the user and expense repository ports.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{
    ExpensePersistenceError, ExpenseRepository, UserPersistenceError, UserRepository,
};
use crate::domain::{
    DateWindow, Email, Expense, ExpenseDraft, ExpenseId, NewUser, User, UserId, UserName,
};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    expenses: BTreeMap<ExpenseId, Expense>,
    next_user: i64,
    next_expense: i64,
    outages: u32,
    lost_acks: u32,
}

impl State {
    fn take_outage(&mut self) -> bool {
        if self.outages == 0 {
            return false;
        }
        self.outages -= 1;
        true
    }
}

/// Repository double backed by ordered maps.
///
/// Ids are assigned sequentially from 1, deleting a user cascades to the
/// user's expenses, and [`InMemoryStore::fail_next`] simulates a store
/// outage for a number of calls.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `calls` repository calls fail with a connection error.
    pub fn fail_next(&self, calls: u32) {
        self.lock().outages = calls;
    }

    /// Make the next `calls` expense inserts store their row and then
    /// report a timeout, as when the answer is lost after the commit.
    pub fn time_out_after_next_inserts(&self, calls: u32) {
        self.lock().lost_acks = calls;
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Number of stored expenses across all owners.
    pub fn expense_count(&self) -> usize {
        self.lock().expenses.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("in-memory store mutex"),
        }
    }

    fn user_state(&self) -> Result<MutexGuard<'_, State>, UserPersistenceError> {
        let mut state = self.lock();
        if state.take_outage() {
            return Err(UserPersistenceError::connection("simulated outage"));
        }
        Ok(state)
    }

    fn expense_state(&self) -> Result<MutexGuard<'_, State>, ExpensePersistenceError> {
        let mut state = self.lock();
        if state.take_outage() {
            return Err(ExpensePersistenceError::connection("simulated outage"));
        }
        Ok(state)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &NewUser) -> Result<User, UserPersistenceError> {
        let mut state = self.user_state()?;
        if state.users.values().any(|existing| existing.email() == &user.email) {
            return Err(UserPersistenceError::duplicate_email());
        }
        state.next_user += 1;
        let id = UserId::new(state.next_user);
        let stored = User::new(
            id,
            user.email.clone(),
            user.name.clone(),
            user.password_hash.clone(),
        );
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError> {
        let state = self.user_state()?;
        Ok(state
            .users
            .values()
            .find(|user| user.email() == email)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.user_state()?.users.get(&id).cloned())
    }

    async fn update_name(
        &self,
        id: UserId,
        name: &UserName,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut state = self.user_state()?;
        let Some(user) = state.users.remove(&id) else {
            return Ok(None);
        };
        let renamed = user.with_name(name.clone());
        state.users.insert(id, renamed.clone());
        Ok(Some(renamed))
    }

    async fn delete(&self, id: UserId) -> Result<bool, UserPersistenceError> {
        let mut state = self.user_state()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.expenses.retain(|_, expense| expense.owner() != id);
        Ok(true)
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryStore {
    async fn insert(
        &self,
        owner: UserId,
        draft: &ExpenseDraft,
    ) -> Result<Expense, ExpensePersistenceError> {
        let mut state = self.expense_state()?;
        if !state.users.contains_key(&owner) {
            return Err(ExpensePersistenceError::query(format!(
                "foreign key violation: user {owner} does not exist"
            )));
        }
        state.next_expense += 1;
        let id = ExpenseId::new(state.next_expense);
        let expense = Expense::new(id, owner, draft.clone());
        state.expenses.insert(id, expense.clone());
        if state.lost_acks > 0 {
            state.lost_acks -= 1;
            return Err(ExpensePersistenceError::timeout("answer lost after commit"));
        }
        Ok(expense)
    }

    async fn find_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
    ) -> Result<Option<Expense>, ExpensePersistenceError> {
        let state = self.expense_state()?;
        Ok(state
            .expenses
            .get(&id)
            .filter(|expense| expense.owner() == owner)
            .cloned())
    }

    async fn update_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
        draft: &ExpenseDraft,
    ) -> Result<Option<Expense>, ExpensePersistenceError> {
        let mut state = self.expense_state()?;
        let Some(slot) = state
            .expenses
            .get_mut(&id)
            .filter(|expense| expense.owner() == owner)
        else {
            return Ok(None);
        };
        *slot = Expense::new(id, owner, draft.clone());
        Ok(Some(slot.clone()))
    }

    async fn delete_owned(
        &self,
        owner: UserId,
        id: ExpenseId,
    ) -> Result<Option<Expense>, ExpensePersistenceError> {
        let mut state = self.expense_state()?;
        let owned = state
            .expenses
            .get(&id)
            .is_some_and(|expense| expense.owner() == owner);
        if !owned {
            return Ok(None);
        }
        Ok(state.expenses.remove(&id))
    }

    async fn list_for_owner(
        &self,
        owner: UserId,
        window: DateWindow,
    ) -> Result<Vec<Expense>, ExpensePersistenceError> {
        let state = self.expense_state()?;
        let mut listed: Vec<Expense> = state
            .expenses
            .values()
            .filter(|expense| expense.owner() == owner && window.contains(expense.date()))
            .cloned()
            .collect();
        listed.sort_by(|left, right| {
            right
                .date()
                .cmp(&left.date())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(listed)
    }
}
