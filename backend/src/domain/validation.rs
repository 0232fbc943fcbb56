//! Field-level validation errors collected across a whole payload.
//!
//! Validators push every violated constraint instead of stopping at the
//! first one, so callers can report all problems in a single response.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::Error;

/// Message used when a required field is missing or blank.
pub const BLANK: &str = "can't be blank";

/// Map of field name to the messages describing its violations.
///
/// # Examples
/// ```
/// use expense_tracker::domain::FieldErrors;
///
/// let mut errors = FieldErrors::default();
/// errors.add("email", "is invalid");
/// errors.add("email", "is too long (maximum is 160 characters)");
/// assert_eq!(errors.messages("email").len(), 2);
/// assert!(errors.into_result(()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    /// Record a violation for `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Record the outcome of a field validator, keeping its value on success.
    pub fn check<T, E: fmt::Display>(
        &mut self,
        field: &'static str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.add(field, error.to_string());
                None
            }
        }
    }

    /// Whether any violation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `field` has at least one violation.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for `field`.
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names of every field with a violation, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    /// Return `value` when no violation was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError(self))
        }
    }

    /// Return the value assembled from the checked fields when every check
    /// passed.
    ///
    /// `value` is `None` whenever a [`FieldErrors::check`] call failed, in
    /// which case the recorded violations are returned.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.is_empty() => Ok(value),
            _ => Err(ValidationError(self)),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A rejected payload together with every violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", summary(.0))]
pub struct ValidationError(FieldErrors);

impl ValidationError {
    /// Build an error reporting a single field.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        Self(errors)
    }

    /// Add another violation to this error.
    #[must_use]
    pub fn with(mut self, field: &'static str, message: impl Into<String>) -> Self {
        self.0.add(field, message);
        self
    }

    /// Access the collected field errors.
    pub fn fields(&self) -> &FieldErrors {
        &self.0
    }
}

fn summary(errors: &FieldErrors) -> String {
    errors
        .0
        .iter()
        .map(|(field, messages)| format!("{field} {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Error::invalid_request("validation failed").with_details(value.0.to_value())
    }
}
