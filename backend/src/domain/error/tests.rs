//! Tests for the error payload formatting and serialisation.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("nope"), ErrorCode::Unauthorized)]
#[case(Error::not_found("gone"), ErrorCode::NotFound)]
#[case(Error::service_unavailable("later"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn authentication_required_is_generic() {
    let error = Error::authentication_required();
    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(error.message(), AUTHENTICATION_REQUIRED);
    assert!(error.details().is_none());
}

#[rstest]
fn serialises_without_details_when_absent() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise");
    assert_eq!(value, json!({ "code": "not_found", "message": "missing" }));
}

#[rstest]
fn serialises_details_when_present() {
    let error = Error::invalid_request("validation failed")
        .with_details(json!({ "email": ["already in use"] }));
    let value = serde_json::to_value(error).expect("serialise");
    assert_eq!(value["details"]["email"][0], "already in use");
}

#[rstest]
fn deserialise_rejects_blank_message() {
    let result: Result<Error, _> =
        serde_json::from_value(json!({ "code": "not_found", "message": " " }));
    assert!(result.is_err());
}

#[rstest]
#[case(ErrorCode::Unauthorized, AUTHENTICATION_REQUIRED)]
#[case(ErrorCode::ServiceUnavailable, TEMPORARILY_UNAVAILABLE)]
#[case(ErrorCode::InternalError, INTERNAL_FAILURE)]
fn blank_messages_fall_back_to_the_code_default(#[case] code: ErrorCode, #[case] text: &str) {
    let error = Error::new(code, "  ");
    assert_eq!(error.code(), code);
    assert_eq!(error.message(), text);
}
