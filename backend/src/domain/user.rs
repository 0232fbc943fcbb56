//! User data model.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::validation::BLANK;

/// Maximum allowed length for an email address.
pub const EMAIL_MAX: usize = 160;
/// Maximum allowed length for a display name.
pub const NAME_MAX: usize = 100;

/// Validation errors returned by the user field constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    BlankEmail,
    EmailTooLong { max: usize },
    InvalidEmail,
    BlankName,
    NameTooLong { max: usize },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankEmail | Self::BlankName => f.write_str(BLANK),
            Self::EmailTooLong { max } | Self::NameTooLong { max } => {
                write!(f, "is too long (maximum is {max} characters)")
            }
            Self::InvalidEmail => f.write_str("is invalid"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Opaque numeric user identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a store-assigned identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Case-sensitive email address used as the login identifier.
///
/// ## Invariants
/// - at most [`EMAIL_MAX`] characters;
/// - exactly one `@` with a non-empty local part and domain;
/// - no whitespace anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Email(String);

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

impl Email {
    /// Validate and construct an [`Email`].
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        let email = email.into();
        if email.trim().is_empty() {
            return Err(UserValidationError::BlankEmail);
        }
        if email.chars().count() > EMAIL_MAX {
            return Err(UserValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        if !email_regex().is_match(&email) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(email))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Human readable display name for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct UserName(String);

impl UserName {
    /// Validate and construct a [`UserName`].
    pub fn new(name: impl Into<String>) -> Result<Self, UserValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(UserValidationError::BlankName);
        }
        if name.chars().count() > NAME_MAX {
            return Err(UserValidationError::NameTooLong { max: NAME_MAX });
        }
        Ok(Self(name))
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserName> for String {
    fn from(value: UserName) -> Self {
        value.0
    }
}

/// Salted one-way password hash in PHC string format.
///
/// Never serialised and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC-formatted hash produced by a credential store.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// PHC string for persistence and verification.
    pub fn as_phc(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Account awaiting its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: Email,
    pub name: UserName,
    pub password_hash: PasswordHash,
}

/// Registered application user.
///
/// Deliberately not `Serialize`: adapters render [`UserPayload`], which omits
/// the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: Email,
    name: UserName,
    password_hash: PasswordHash,
}

impl User {
    /// Build a [`User`] from validated components.
    pub fn new(id: UserId, email: Email, name: UserName, password_hash: PasswordHash) -> Self {
        Self {
            id,
            email,
            name,
            password_hash,
        }
    }

    /// Stable user identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Login email.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Display name.
    pub fn name(&self) -> &UserName {
        &self.name
    }

    /// Stored password hash.
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// Return a copy carrying a new display name.
    pub fn with_name(self, name: UserName) -> Self {
        Self { name, ..self }
    }
}

/// Outward representation of a user: `{id, email, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserPayload {
    fn from(value: &User) -> Self {
        Self {
            id: value.id.get(),
            email: value.email.to_string(),
            name: value.name.to_string(),
        }
    }
}

impl From<User> for UserPayload {
    fn from(value: User) -> Self {
        Self::from(&value)
    }
}
