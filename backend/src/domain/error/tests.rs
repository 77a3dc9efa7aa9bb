//! Tests for the error payload formatting and validation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn conflict_error() -> Error {
    Error::conflict("attribute value already taken")
        .with_details(json!({"attribute": "email"}))
}

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[case(Error::not_found("x"), ErrorCode::NotFound)]
#[case(Error::conflict("x"), ErrorCode::Conflict)]
#[case(Error::unauthorized("x"), ErrorCode::Unauthorized)]
#[case(Error::service_unavailable("x"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("x"), ErrorCode::InternalError)]
fn convenience_constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn serialises_camel_case_with_snake_case_code(conflict_error: Error) {
    let value = serde_json::to_value(&conflict_error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "attribute value already taken",
            "details": {"attribute": "email"},
        })
    );
}

#[rstest]
fn details_are_omitted_when_absent() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise error");
    assert!(value.get("details").is_none());
}

#[rstest]
fn deserialising_blank_message_fails() {
    let result: Result<Error, _> =
        serde_json::from_value(json!({"code": "not_found", "message": "  "}));
    assert!(result.is_err());
}

#[rstest]
fn display_uses_message(conflict_error: Error) {
    assert_eq!(conflict_error.to_string(), "attribute value already taken");
}
