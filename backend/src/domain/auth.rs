//! Authentication primitives: login credentials and registration requests.
//!
//! Keep inbound payload parsing outside the services by exposing
//! constructors that validate string inputs before a service talks to a port.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroizing;

use super::user::{Email, UserName};
use super::validation::{BLANK, FieldErrors, ValidationError};

/// Minimum accepted password length.
pub const PASSWORD_MIN: usize = 6;
/// Maximum accepted password length.
pub const PASSWORD_MAX: usize = 128;

/// Password constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordValidationError {
    Blank,
    TooShort { min: usize },
    TooLong { max: usize },
}

impl fmt::Display for PasswordValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => f.write_str(BLANK),
            Self::TooShort { min } => write!(f, "is too short (minimum is {min} characters)"),
            Self::TooLong { max } => write!(f, "is too long (maximum is {max} characters)"),
        }
    }
}

impl std::error::Error for PasswordValidationError {}

/// Plaintext password that satisfies the registration policy.
///
/// The buffer is wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Validate a candidate password.
    pub fn new(password: &str) -> Result<Self, PasswordValidationError> {
        if password.is_empty() {
            return Err(PasswordValidationError::Blank);
        }
        let length = password.chars().count();
        if length < PASSWORD_MIN {
            return Err(PasswordValidationError::TooShort { min: PASSWORD_MIN });
        }
        if length > PASSWORD_MAX {
            return Err(PasswordValidationError::TooLong { max: PASSWORD_MAX });
        }
        Ok(Self(Zeroizing::new(password.to_owned())))
    }

    /// Plaintext for hashing.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Raw registration input: `{email, password, name}`.
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Zeroizing<String>,
    #[serde(default)]
    pub name: String,
}

impl fmt::Debug for RegistrationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationPayload")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl RegistrationPayload {
    /// Build a payload from borrowed parts.
    pub fn new(email: &str, password: &str, name: &str) -> Self {
        Self {
            email: email.to_owned(),
            password: Zeroizing::new(password.to_owned()),
            name: name.to_owned(),
        }
    }
}

/// Registration whose fields all satisfy their format constraints.
///
/// Email uniqueness is checked later against the store.
#[derive(Debug, Clone)]
pub struct Registration {
    email: Email,
    password: Password,
    name: UserName,
}

impl Registration {
    /// Validate every field, reporting all violations together.
    ///
    /// # Examples
    /// ```
    /// use expense_tracker::domain::{Registration, RegistrationPayload};
    ///
    /// let err = Registration::validate(&RegistrationPayload::new("bad", "123", ""))
    ///     .expect_err("all three fields are invalid");
    /// let fields: Vec<_> = err.fields().fields().collect();
    /// assert_eq!(fields, ["email", "name", "password"]);
    /// ```
    pub fn validate(payload: &RegistrationPayload) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::default();
        let email = errors.check("email", Email::new(payload.email.as_str()));
        let password = errors.check("password", Password::new(payload.password.as_str()));
        let name = errors.check("name", UserName::new(payload.name.as_str()));

        let fields = email
            .zip(password)
            .zip(name)
            .map(|((email, password), name)| Self {
                email,
                password,
                name,
            });
        errors.finish(fields)
    }

    /// Validated email.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Validated password.
    pub fn password(&self) -> &Password {
        &self.password
    }

    /// Validated display name.
    pub fn name(&self) -> &UserName {
        &self.name
    }
}

/// Login input: `{email, password}`.
///
/// No format validation happens here: malformed input simply fails to
/// authenticate, along the same path as an unknown account.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        }
    }

    /// Email string suitable for user lookups.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", PasswordValidationError::Blank)]
    #[case("123", PasswordValidationError::TooShort { min: PASSWORD_MIN })]
    fn password_rejects_weak_values(
        #[case] raw: &str,
        #[case] expected: PasswordValidationError,
    ) {
        assert_eq!(Password::new(raw).err(), Some(expected));
    }

    #[rstest]
    fn password_rejects_overlong_values() {
        let raw = "p".repeat(PASSWORD_MAX + 1);
        assert_eq!(
            Password::new(&raw).err(),
            Some(PasswordValidationError::TooLong { max: PASSWORD_MAX })
        );
    }

    #[rstest]
    fn registration_reports_every_invalid_field() {
        let err = Registration::validate(&RegistrationPayload::new("bad", "123", ""))
            .expect_err("invalid registration");
        let fields = err.fields();
        assert_eq!(fields.messages("email"), ["is invalid".to_owned()]);
        assert_eq!(
            fields.messages("password"),
            ["is too short (minimum is 6 characters)".to_owned()]
        );
        assert_eq!(fields.messages("name"), ["can't be blank".to_owned()]);
    }

    #[rstest]
    fn registration_accepts_valid_payload() {
        let registration =
            Registration::validate(&RegistrationPayload::new("ada@example.com", "secret1", "Ada"))
                .expect("valid registration");
        assert_eq!(registration.email().as_ref(), "ada@example.com");
        assert_eq!(registration.password().expose(), "secret1");
        assert_eq!(registration.name().as_ref(), "Ada");
    }

    #[rstest]
    fn registration_payload_ignores_missing_fields() {
        let payload: RegistrationPayload =
            serde_json::from_str(r#"{"email":"ada@example.com"}"#).expect("deserialise");
        let err = Registration::validate(&payload).expect_err("password and name missing");
        assert!(err.fields().contains("password"));
        assert!(err.fields().contains("name"));
        assert!(!err.fields().contains("email"));
    }

    #[rstest]
    fn debug_output_never_contains_passwords() {
        let creds = LoginCredentials::new("ada@example.com", "hunter22");
        let payload = RegistrationPayload::new("ada@example.com", "hunter22", "Ada");
        let password = Password::new("hunter22").expect("valid password");

        for rendered in [
            format!("{creds:?}"),
            format!("{payload:?}"),
            format!("{password:?}"),
        ] {
            assert!(!rendered.contains("hunter22"), "leaked: {rendered}");
        }
    }
}
