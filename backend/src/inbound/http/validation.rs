//! Shared validation helpers for inbound HTTP adapters.
//!
//! Identifiers and timestamps arrive as strings so malformed values produce
//! a field-level `invalid_request` payload instead of an opaque extractor
//! failure.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidRole,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidRole => "invalid_role",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let details = match value {
        Some(value) => json!({ "field": field.as_str(), "value": value, "code": code.as_str() }),
        None => json!({ "field": field.as_str(), "code": code.as_str() }),
    };
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        format!("missing required field: {name}"),
        ErrorCode::MissingField,
        None,
    )
}

/// Parse a UUID-backed id such as `UserId`, `PostId` or a bare `Uuid`.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse::<T>().map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            Some(value),
        )
    })
}

/// Parse an optional typed id, treating blank strings as absent.
pub(crate) fn parse_optional_id<T: FromStr>(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<T>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_id(raw, field))
        .transpose()
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| {
            field_error(
                field,
                format!("{} must be an RFC 3339 timestamp", field.as_str()),
                ErrorCode::InvalidTimestamp,
                Some(value),
            )
        })
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

pub(crate) fn invalid_role_error(field: FieldName, value: &str) -> Error {
    field_error(
        field,
        format!(
            "{} must be one of farmer, expert, extension_worker, admin",
            field.as_str()
        ),
        ErrorCode::InvalidRole,
        Some(value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode as DomainCode, PostId};
    use rstest::rstest;
    use serde_json::Value;

    const POST_ID: FieldName = FieldName::new("postId");

    #[rstest]
    fn parses_valid_ids() {
        let id: PostId =
            parse_id("0f8b6c3e-52a1-4c3d-9c1e-2b7a8d9e0f11", POST_ID).expect("valid id");
        assert_eq!(id.to_string(), "0f8b6c3e-52a1-4c3d-9c1e-2b7a8d9e0f11");
    }

    #[rstest]
    fn invalid_id_reports_field_and_value() {
        let err = parse_id::<PostId>("post-7", POST_ID).expect_err("invalid id");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details.get("field").and_then(Value::as_str), Some("postId"));
        assert_eq!(details.get("value").and_then(Value::as_str), Some("post-7"));
        assert_eq!(details.get("code").and_then(Value::as_str), Some("invalid_uuid"));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("   "))]
    fn blank_optional_ids_are_absent(#[case] raw: Option<&str>) {
        let parsed = parse_optional_id::<PostId>(raw, POST_ID).expect("absent id");
        assert!(parsed.is_none());
    }

    #[rstest]
    fn timestamps_normalise_to_utc() {
        let parsed = parse_rfc3339_timestamp("2025-03-01T10:00:00+05:30", FieldName::new("asOf"))
            .expect("valid timestamp");
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T04:30:00+00:00");
    }

    #[rstest]
    fn malformed_timestamp_is_rejected() {
        let err = parse_optional_rfc3339_timestamp(Some("yesterday"), FieldName::new("asOf"))
            .expect_err("invalid timestamp");
        let details = err.details().expect("details");
        assert_eq!(
            details.get("code").and_then(Value::as_str),
            Some("invalid_timestamp")
        );
    }
}
