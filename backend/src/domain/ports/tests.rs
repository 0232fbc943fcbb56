//! Contract checks for the repository ports, run against the in-memory
//! adapter so the behaviour the services rely on stays pinned down.

use super::*;
use crate::domain::{
    Amount, Category, Currency, DateWindow, Description, Email, ExpenseDraft, ExpenseId, NewUser,
    PasswordHash, UserId, UserName,
};
use crate::test_support::InMemoryStore;
use chrono::NaiveDate;
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date")
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: Email::new(email).expect("valid email"),
        name: UserName::new("Ada").expect("valid name"),
        password_hash: PasswordHash::from_phc("$argon2id$v=19$stub"),
    }
}

fn draft(day: u32) -> ExpenseDraft {
    ExpenseDraft {
        amount: Amount::new(Decimal::new(1000, 2)).expect("valid amount"),
        description: Description::new(format!("day {day}")).expect("valid description"),
        category: Category::Others,
        date: date(day),
        currency: Currency::usd(),
    }
}

#[fixture]
fn store() -> InMemoryStore {
    InMemoryStore::new()
}

async fn user(store: &InMemoryStore, email: &str) -> UserId {
    UserRepository::insert(store, &new_user(email))
        .await
        .expect("insert user")
        .id()
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_reported(store: InMemoryStore) {
    user(&store, "ada@example.com").await;
    let err = UserRepository::insert(&store, &new_user("ada@example.com"))
        .await
        .expect_err("duplicate");
    assert_eq!(err, UserPersistenceError::duplicate_email());
}

#[rstest]
#[tokio::test]
async fn email_lookup_is_case_sensitive(store: InMemoryStore) {
    user(&store, "ada@example.com").await;
    let email = Email::new("Ada@example.com").expect("valid email");
    assert!(store.find_by_email(&email).await.expect("lookup").is_none());
}

#[rstest]
#[tokio::test]
async fn owner_filter_hides_foreign_expenses(store: InMemoryStore) {
    let ada = user(&store, "ada@example.com").await;
    let bob = user(&store, "bob@example.com").await;
    let expense = ExpenseRepository::insert(&store, ada, &draft(3))
        .await
        .expect("insert");

    assert!(store.find_owned(bob, expense.id()).await.expect("find").is_none());
    assert!(
        store
            .update_owned(bob, expense.id(), &draft(4))
            .await
            .expect("update")
            .is_none()
    );
    assert!(store.delete_owned(bob, expense.id()).await.expect("delete").is_none());
    assert_eq!(store.expense_count(), 1);
}

#[rstest]
#[tokio::test]
async fn listing_is_newest_first_with_insertion_order_ties(store: InMemoryStore) {
    let ada = user(&store, "ada@example.com").await;
    for day in [5, 9, 5, 1] {
        ExpenseRepository::insert(&store, ada, &draft(day))
            .await
            .expect("insert");
    }

    let window = DateWindow {
        from: Some(date(2)),
        to: None,
    };
    let listed = store.list_for_owner(ada, window).await.expect("list");
    let ids: Vec<ExpenseId> = listed.iter().map(|expense| expense.id()).collect();
    assert_eq!(ids, [ExpenseId::new(2), ExpenseId::new(1), ExpenseId::new(3)]);
}

#[rstest]
#[tokio::test]
async fn deleting_a_user_cascades(store: InMemoryStore) {
    let ada = user(&store, "ada@example.com").await;
    ExpenseRepository::insert(&store, ada, &draft(1))
        .await
        .expect("insert");

    assert!(UserRepository::delete(&store, ada).await.expect("delete"));
    assert_eq!(store.expense_count(), 0);
    assert!(!UserRepository::delete(&store, ada).await.expect("second delete"));
}

#[rstest]
#[tokio::test]
async fn expenses_need_an_existing_owner(store: InMemoryStore) {
    let err = ExpenseRepository::insert(&store, UserId::new(404), &draft(1))
        .await
        .expect_err("missing owner");
    assert!(matches!(err, ExpensePersistenceError::Query { .. }));
}
