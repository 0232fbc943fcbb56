//! Tests for batch import.

use chrono::NaiveDate;
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use serde_json::json;

use super::*;
use crate::domain::{ErrorCode, ListFilterParams};
use crate::test_support::{InMemoryStore, MutableClock, RecordingSleeper, fast_credential_store};

struct Harness {
    store: Arc<InMemoryStore>,
    sleeper: Arc<RecordingSleeper>,
    ledger: ExpenseLedger<InMemoryStore>,
    accounts: AccountManager<InMemoryStore>,
    importer: ExpenseImporter<InMemoryStore, InMemoryStore>,
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_secs(1),
    }
}

#[fixture]
fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(MutableClock::at_date(
        NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let accounts = AccountManager::new(Arc::clone(&store), fast_credential_store());
    let ledger = ExpenseLedger::new(Arc::clone(&store), clock);
    let importer = ExpenseImporter::new(accounts.clone(), ledger.clone())
        .with_retry(policy(), sleeper.clone());
    Harness {
        store,
        sleeper,
        ledger,
        accounts,
        importer,
    }
}

fn expense(amount: i64, description: &str) -> ExpensePayload {
    ExpensePayload {
        amount: Some(Decimal::from(amount)),
        description: Some(description.to_owned()),
        ..ExpensePayload::default()
    }
}

fn entry(email: &str, expenses: Vec<ExpensePayload>) -> ImportEntry {
    ImportEntry {
        user: RegistrationPayload::new(email, "secret1", "Imported"),
        expenses,
    }
}

fn sample_batch() -> ImportBatch {
    ImportBatch {
        entries: vec![
            entry(
                "ada@example.com",
                vec![expense(12, "Lunch"), expense(30, "Books")],
            ),
            entry("bob@example.com", vec![expense(5, "Coffee")]),
        ],
    }
}

#[rstest]
#[tokio::test]
async fn imports_accounts_with_their_expenses(harness: Harness) {
    let report = harness
        .importer
        .import(&sample_batch())
        .await
        .expect("import");

    assert_eq!(
        report,
        ImportReport {
            users_created: 2,
            users_skipped: 0,
            expenses_created: 3,
        }
    );
    let ada = harness
        .accounts
        .find_by_email("ada@example.com")
        .await
        .expect("lookup")
        .expect("ada imported");
    let listed = harness
        .ledger
        .list(ada.id(), &ListFilterParams::default())
        .await
        .expect("list");
    assert_eq!(listed.len(), 2);
    assert!(harness.sleeper.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn replaying_a_batch_changes_nothing(harness: Harness) {
    harness
        .importer
        .import(&sample_batch())
        .await
        .expect("first import");

    let replay = harness
        .importer
        .import(&sample_batch())
        .await
        .expect("replay");

    assert_eq!(
        replay,
        ImportReport {
            users_created: 0,
            users_skipped: 2,
            expenses_created: 0,
        }
    );
    assert_eq!(harness.store.user_count(), 2);
    assert_eq!(harness.store.expense_count(), 3);
}

#[rstest]
#[tokio::test]
async fn invalid_account_aborts_with_entry_index(harness: Harness) {
    let mut batch = sample_batch();
    batch.entries.insert(1, entry("not-an-email", Vec::new()));

    let err = harness
        .importer
        .import(&batch)
        .await
        .expect_err("invalid entry");

    let ImportError::InvalidEntry { index, source } = err else {
        panic!("expected invalid entry, got {err:?}");
    };
    assert_eq!(index, 1);
    assert!(source.fields().contains("email"));
    assert_eq!(harness.store.user_count(), 1);
}

#[rstest]
#[tokio::test]
async fn invalid_expense_writes_nothing_for_its_entry(harness: Harness) {
    let batch = ImportBatch {
        entries: vec![
            entry("bob@example.com", vec![expense(5, "Coffee")]),
            entry(
                "ada@example.com",
                vec![expense(12, "Lunch"), expense(-1, "Refund")],
            ),
        ],
    };

    let err = harness
        .importer
        .import(&batch)
        .await
        .expect_err("invalid expense");

    let ImportError::InvalidEntry { index, source } = err else {
        panic!("expected invalid entry, got {err:?}");
    };
    assert_eq!(index, 1);
    assert!(source.fields().contains("amount"));
    assert_eq!(harness.store.user_count(), 1);
    assert_eq!(harness.store.expense_count(), 1);
}

#[rstest]
#[tokio::test]
async fn fixed_batch_imports_the_previously_rejected_entry(harness: Harness) {
    let broken = ImportBatch {
        entries: vec![entry(
            "ada@example.com",
            vec![expense(12, "Lunch"), expense(-1, "Refund")],
        )],
    };
    harness
        .importer
        .import(&broken)
        .await
        .expect_err("invalid expense");

    let fixed = ImportBatch {
        entries: vec![entry(
            "ada@example.com",
            vec![expense(12, "Lunch"), expense(1, "Refund")],
        )],
    };
    let report = harness.importer.import(&fixed).await.expect("fixed run");

    assert_eq!(
        report,
        ImportReport {
            users_created: 1,
            users_skipped: 0,
            expenses_created: 2,
        }
    );
    assert_eq!(harness.store.expense_count(), 2);
}

#[rstest]
#[tokio::test]
async fn transient_outage_is_retried_with_backoff(harness: Harness) {
    harness.store.fail_next(2);

    let report = harness
        .importer
        .import(&sample_batch())
        .await
        .expect("import recovers");

    assert_eq!(report.users_created, 2);
    assert_eq!(
        harness.sleeper.calls(),
        [Duration::from_millis(10), Duration::from_millis(20)]
    );
}

#[rstest]
#[tokio::test]
async fn exhausted_retries_report_unavailable(harness: Harness) {
    harness.store.fail_next(3);

    let err = harness
        .importer
        .import(&sample_batch())
        .await
        .expect_err("store stays down");

    assert!(matches!(err, ImportError::Unavailable { index: 0, .. }));
    assert_eq!(harness.sleeper.calls().len(), 2);
    assert_eq!(harness.store.user_count(), 0);
    assert_eq!(Error::from(err).code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
fn batch_reads_from_json() {
    let batch: ImportBatch = serde_json::from_value(json!({
        "entries": [
            {
                "user": { "email": "ada@example.com", "password": "secret1", "name": "Ada" },
                "expenses": [
                    { "amount": "9.99", "description": "Tea", "category": "food", "user_id": 42 }
                ]
            },
            { "user": { "email": "bob@example.com", "password": "secret1", "name": "Bob" } }
        ]
    }))
    .expect("valid batch");

    assert_eq!(batch.entries.len(), 2);
    assert_eq!(batch.entries[0].expenses.len(), 1);
    assert!(batch.entries[1].expenses.is_empty());
}

#[rstest]
fn invalid_entry_maps_to_field_details() {
    let error = Error::from(ImportError::InvalidEntry {
        index: 4,
        source: ValidationError::single("amount", "must be greater than 0"),
    });

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details(),
        Some(&json!({ "entry": 4, "fields": { "amount": ["must be greater than 0"] } }))
    );
}

#[rstest]
#[case(1, 10)]
#[case(2, 20)]
#[case(3, 40)]
#[case(20, 1_000)]
fn backoff_doubles_up_to_the_cap(#[case] attempt: u32, #[case] expected_ms: u64) {
    assert_eq!(policy().delay_after(attempt), Duration::from_millis(expected_ms));
}

#[rstest]
#[tokio::test]
async fn timed_out_expense_write_is_not_repeated(harness: Harness) {
    harness.store.time_out_after_next_inserts(1);

    let err = harness
        .importer
        .import(&sample_batch())
        .await
        .expect_err("write outcome unknown");

    assert!(matches!(err, ImportError::Unavailable { index: 0, .. }));
    assert!(harness.sleeper.calls().is_empty());
    assert_eq!(harness.store.expense_count(), 1);
}

#[rstest]
#[case(LedgerError::Unavailable { message: "down".to_owned() }, Step::Write, true)]
#[case(LedgerError::TimedOut { message: "5s".to_owned() }, Step::Write, false)]
#[case(LedgerError::NotFound, Step::Read, false)]
fn ledger_failures_classify_by_step(
    #[case] error: LedgerError,
    #[case] step: Step,
    #[case] transient: bool,
) {
    assert_eq!(error.is_transient(step), transient);
}

#[rstest]
#[case(AccountError::TimedOut { message: "5s".to_owned() }, Step::Read, true)]
#[case(AccountError::TimedOut { message: "5s".to_owned() }, Step::Write, false)]
#[case(AccountError::InvalidCredentials, Step::Read, false)]
fn account_failures_classify_by_step(
    #[case] error: AccountError,
    #[case] step: Step,
    #[case] transient: bool,
) {
    assert_eq!(error.is_transient(step), transient);
}
