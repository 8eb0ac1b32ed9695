//! Shared validation helpers for inbound HTTP adapters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{Error, MediaAsset, MovieTitle, UserId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidBase64,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidBase64 => "invalid_base64",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

/// Unwrap a required body field.
pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

pub(crate) fn parse_user_id(value: &str, field: FieldName) -> Result<UserId, Error> {
    UserId::new(value).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field, value))
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

/// Validate a title taken from the request path.
pub(crate) fn parse_title(raw: &str) -> Result<MovieTitle, Error> {
    Ok(MovieTitle::new(raw)?)
}

/// Decode a base64 upload into a media asset.
pub(crate) fn decode_media(
    content_type: &str,
    data: &str,
    field: FieldName,
) -> Result<MediaAsset, Error> {
    let bytes = STANDARD.decode(data.trim()).map_err(|_| {
        let field = field.as_str();
        ValidationError::new(field, format!("{field} data must be base64"))
            .with_code(ErrorCode::InvalidBase64)
    })?;
    Ok(MediaAsset::new(content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode as DomainCode;
    use rstest::rstest;
    use serde_json::Value;

    const FIELD: FieldName = FieldName::new("startTime");

    fn detail<'a>(error: &'a Error, key: &str) -> Option<&'a str> {
        error.details().and_then(|d| d.get(key)).and_then(Value::as_str)
    }

    #[rstest]
    fn missing_fields_name_the_field() {
        let err = require::<u32>(None, FieldName::new("seats")).expect_err("missing");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        assert_eq!(detail(&err, "field"), Some("seats"));
        assert_eq!(detail(&err, "code"), Some("missing_field"));
    }

    #[rstest]
    #[case("2026-03-01T19:00:00Z", true)]
    #[case("2026-03-01T21:00:00+02:00", true)]
    #[case("tomorrow", false)]
    #[case("2026-03-01 19:00", false)]
    fn timestamps_must_be_rfc3339(#[case] raw: &str, #[case] valid: bool) {
        let parsed = parse_rfc3339_timestamp(raw, FIELD);
        assert_eq!(parsed.is_ok(), valid);
        if let Err(err) = parsed {
            assert_eq!(detail(&err, "code"), Some("invalid_timestamp"));
            assert_eq!(detail(&err, "value"), Some(raw));
        }
    }

    #[rstest]
    fn offsets_are_normalised_to_utc() {
        let parsed = parse_rfc3339_timestamp("2026-03-01T21:00:00+02:00", FIELD).expect("valid");
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T19:00:00+00:00");
    }

    #[rstest]
    fn user_ids_must_be_uuids() {
        let err = parse_user_id("42", FieldName::new("id")).expect_err("invalid");
        assert_eq!(detail(&err, "code"), Some("invalid_uuid"));
    }

    #[rstest]
    fn media_is_decoded_and_content_type_normalised() {
        let asset = decode_media(" Image/PNG ", "aGVsbG8=", FieldName::new("poster"))
            .expect("decodes");
        assert_eq!(asset.content_type, "image/png");
        assert_eq!(asset.bytes, b"hello");
    }

    #[rstest]
    fn bad_base64_is_rejected() {
        let err = decode_media("image/png", "not base64!", FieldName::new("poster"))
            .expect_err("invalid");
        assert_eq!(detail(&err, "code"), Some("invalid_base64"));
    }

    #[rstest]
    fn blank_titles_are_invalid_requests() {
        let err = parse_title("   ").expect_err("blank");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
    }
}
