//! Tests for the account manager.

use std::sync::Mutex;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::MockUserRepository;
use crate::domain::{CredentialError, ErrorCode, PasswordHash};
use crate::test_support::{InMemoryStore, fast_credential_store};

/// Credential store double that records which operation ran.
#[derive(Default)]
struct RecordingCredentials {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingCredentials {
    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls mutex").push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls mutex").clone()
    }
}

impl CredentialStore for RecordingCredentials {
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialError> {
        self.record("hash");
        Ok(PasswordHash::from_phc(format!("plain:{password}")))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        self.record("verify");
        hash.as_phc() == format!("plain:{password}")
    }

    fn verify_dummy(&self, _password: &str) {
        self.record("verify_dummy");
    }
}

fn stored_user(id: i64, email: &str, password: &str) -> User {
    User::new(
        UserId::new(id),
        Email::new(email).expect("valid email"),
        UserName::new("Ada").expect("valid name"),
        PasswordHash::from_phc(format!("plain:{password}")),
    )
}

#[fixture]
fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

fn manager(store: &Arc<InMemoryStore>) -> AccountManager<InMemoryStore> {
    AccountManager::new(Arc::clone(store), fast_credential_store())
}

#[rstest]
#[tokio::test]
async fn registered_account_authenticates_immediately(store: Arc<InMemoryStore>) {
    let accounts = manager(&store);
    let user = accounts
        .register(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
        .await
        .expect("registration succeeds");

    let authenticated = accounts
        .authenticate(&LoginCredentials::new("ada@example.com", "secret1"))
        .await
        .expect("login succeeds");
    assert_eq!(authenticated.id(), user.id());
    assert_ne!(user.password_hash().as_phc(), "secret1");
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_a_field_error(store: Arc<InMemoryStore>) {
    let accounts = manager(&store);
    let original = accounts
        .register(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
        .await
        .expect("first registration");

    let err = accounts
        .register(&RegistrationPayload::new("ada@example.com", "other-pass", "Imposter"))
        .await
        .expect_err("duplicate email");
    let AccountError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(validation.fields().messages("email"), [EMAIL_TAKEN.to_owned()]);

    let still_there = accounts
        .authenticate(&LoginCredentials::new("ada@example.com", "secret1"))
        .await
        .expect("original account unaffected");
    assert_eq!(still_there.id(), original.id());
    assert_eq!(still_there.name().as_ref(), "Ada");
    assert_eq!(store.user_count(), 1);
}

#[rstest]
#[tokio::test]
async fn duplicate_email_joins_other_field_errors(store: Arc<InMemoryStore>) {
    let accounts = manager(&store);
    accounts
        .register(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
        .await
        .expect("first registration");

    let err = accounts
        .register(&RegistrationPayload::new("ada@example.com", "123", ""))
        .await
        .expect_err("invalid registration");
    let AccountError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<_> = validation.fields().fields().collect();
    assert_eq!(fields, ["email", "name", "password"]);
}

#[rstest]
#[tokio::test]
async fn invalid_registration_reports_all_fields_and_persists_nothing(
    store: Arc<InMemoryStore>,
) {
    let err = manager(&store)
        .register(&RegistrationPayload::new("bad", "123", ""))
        .await
        .expect_err("invalid registration");

    let AccountError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    for field in ["email", "password", "name"] {
        assert!(validation.fields().contains(field), "missing {field}");
    }
    assert_eq!(store.user_count(), 0);
}

#[rstest]
#[tokio::test]
async fn unknown_email_and_wrong_password_fail_identically() {
    let credentials = Arc::new(RecordingCredentials::default());
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().returning(|email| {
        Ok((email.as_ref() == "ada@example.com")
            .then(|| stored_user(1, "ada@example.com", "secret1")))
    });
    let accounts = AccountManager::new(Arc::new(repo), credentials.clone());

    let unknown = accounts
        .authenticate(&LoginCredentials::new("nobody@example.com", "secret1"))
        .await
        .expect_err("unknown email");
    let wrong = accounts
        .authenticate(&LoginCredentials::new("ada@example.com", "wrong-pass"))
        .await
        .expect_err("wrong password");

    assert_eq!(unknown, AccountError::InvalidCredentials);
    assert_eq!(unknown, wrong);
    assert_eq!(Error::from(unknown), Error::from(wrong));
    assert_eq!(credentials.calls(), ["verify_dummy", "verify"]);
}

#[rstest]
#[tokio::test]
async fn malformed_login_email_still_runs_dummy_verification() {
    let credentials = Arc::new(RecordingCredentials::default());
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().times(0);
    let accounts = AccountManager::new(Arc::new(repo), credentials.clone());

    let err = accounts
        .authenticate(&LoginCredentials::new("", ""))
        .await
        .expect_err("blank credentials");

    assert_eq!(err, AccountError::InvalidCredentials);
    assert_eq!(credentials.calls(), ["verify_dummy"]);
}

#[rstest]
#[tokio::test]
async fn invalid_credentials_map_to_generic_unauthorized() {
    let error = Error::from(AccountError::InvalidCredentials);
    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(error.message(), INVALID_CREDENTIALS);
    assert!(error.details().is_none());
}

#[rstest]
#[case(UserPersistenceError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserPersistenceError::timeout("5s"), ErrorCode::ServiceUnavailable)]
#[case(UserPersistenceError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn store_failures_map_to_boundary_codes(
    #[case] failure: UserPersistenceError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_id()
        .times(1)
        .return_once(move |_| Err(failure));
    let accounts = AccountManager::new(Arc::new(repo), fast_credential_store());

    let err = accounts
        .find_by_id(UserId::new(1))
        .await
        .expect_err("store failure");
    let boundary = Error::from(err);
    assert_eq!(boundary.code(), expected);
    assert!(!boundary.message().contains("syntax"));
}

#[rstest]
#[tokio::test]
async fn racing_insert_reports_email_in_use() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().returning(|_| Ok(None));
    repo.expect_insert()
        .times(1)
        .return_once(|_| Err(UserPersistenceError::duplicate_email()));
    let accounts = AccountManager::new(
        Arc::new(repo),
        Arc::new(RecordingCredentials::default()),
    );

    let err = accounts
        .register(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
        .await
        .expect_err("insert conflict");
    assert_eq!(
        err,
        AccountError::Validation(ValidationError::single("email", EMAIL_TAKEN))
    );
}

#[rstest]
#[tokio::test]
async fn rename_updates_only_the_name(store: Arc<InMemoryStore>) {
    let accounts = manager(&store);
    let user = accounts
        .register(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
        .await
        .expect("registration");

    let renamed = accounts
        .rename(user.id(), "Countess of Lovelace")
        .await
        .expect("rename");
    assert_eq!(renamed.id(), user.id());
    assert_eq!(renamed.email(), user.email());
    assert_eq!(renamed.name().as_ref(), "Countess of Lovelace");

    let blank = accounts.rename(user.id(), " ").await.expect_err("blank");
    assert!(matches!(blank, AccountError::Validation(_)));

    let missing = accounts
        .rename(UserId::new(404), "Nobody")
        .await
        .expect_err("missing");
    assert_eq!(missing, AccountError::NotFound);
}

#[rstest]
#[tokio::test]
async fn deleted_account_can_no_longer_log_in(store: Arc<InMemoryStore>) {
    let accounts = manager(&store);
    let user = accounts
        .register(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
        .await
        .expect("registration");

    accounts.delete_account(user.id()).await.expect("delete");
    assert_eq!(accounts.find_by_id(user.id()).await.expect("lookup"), None);
    assert_eq!(
        accounts
            .authenticate(&LoginCredentials::new("ada@example.com", "secret1"))
            .await,
        Err(AccountError::InvalidCredentials)
    );
    assert_eq!(
        accounts.delete_account(user.id()).await,
        Err(AccountError::NotFound)
    );
}
