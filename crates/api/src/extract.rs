//! Request decoding and validation.
//!
//! [`ValidatedJson`] reads the whole body, decodes it as JSON and runs the
//! type's `validator` rules. [`RawBody`] is the unparsed variant for handlers
//! that verify or inspect bytes first. Any failure is answered with the
//! standard error envelope before the handler runs.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// Whole request body, with read failures (including the body size limit)
/// reported as `BAD_REQUEST`.
#[derive(Debug, Clone, Default)]
pub struct RawBody(pub Bytes);

impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Bytes::from_request(req, state)
            .await
            .map(Self)
            .map_err(|e| AppError::bad_request("request body could not be read").with_source(e))
    }
}

/// JSON body extractor that also validates the decoded value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let RawBody(bytes) = RawBody::from_request(req, state).await?;
        decode_and_validate(&bytes).map(Self)
    }
}

/// Decode `body` as JSON into `T` and validate it.
///
/// # Errors
///
/// - `BAD_REQUEST` if the body is empty or not valid JSON for `T`
/// - `VALIDATION_ERROR` listing every violated rule as `"field: message"`
pub fn decode_and_validate<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::bad_request("request body is empty"));
    }

    let value: T = serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request("malformed JSON body").with_detail(e.to_string()))?;

    value
        .validate()
        .map_err(|errors| AppError::validation("invalid request").with_details(flatten(&errors)))?;

    Ok(value)
}

/// Flatten nested validation errors into sorted `"path: message"` lines.
fn flatten(errors: &ValidationErrors) -> Vec<String> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    collect(errors, "", &mut out);
    out.into_iter()
        .flat_map(|(field, messages)| {
            messages
                .into_iter()
                .map(move |message| format!("{field}: {message}"))
        })
        .collect()
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut BTreeMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = out.entry(path).or_default();
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| default_message(&error.code), ToString::to_string);
                    messages.push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

fn default_message(code: &str) -> String {
    match code {
        "required" => "is required".to_owned(),
        "email" => "must be a valid email address".to_owned(),
        "length" => "has an invalid length".to_owned(),
        "range" => "is out of range".to_owned(),
        other => format!("failed {other} check"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::error::ErrorCode;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(email(message = "must be a valid email address"))]
        email: String,
        #[validate(length(min = 8, message = "must be at least 8 characters"))]
        password: String,
        #[validate(length(min = 1, message = "is required"))]
        name: String,
        #[validate(nested)]
        address: Address,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Address {
        #[validate(length(min = 1, message = "is required"))]
        city: String,
    }

    #[test]
    fn test_valid_body_decodes() {
        let body = br#"{"email":"a@b.co","password":"longenough","name":"A","address":{"city":"Oslo"}}"#;
        let signup: Signup = decode_and_validate(body).unwrap();
        assert_eq!(signup.name, "A");
        assert_eq!(signup.address.city, "Oslo");
    }

    #[test]
    fn test_empty_body_is_bad_request() {
        let err = decode_and_validate::<Signup>(b"  ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let err = decode_and_validate::<Signup>(b"{\"email\":").unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.details().len(), 1);
    }

    #[test]
    fn test_all_violations_listed_and_sorted() {
        let body = br#"{"email":"nope","password":"short","name":"","address":{"city":""}}"#;
        let err = decode_and_validate::<Signup>(body).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(
            err.details(),
            [
                "address.city: is required",
                "email: must be a valid email address",
                "name: is required",
                "password: must be at least 8 characters",
            ]
        );
    }

    #[test]
    fn test_default_message_fallback() {
        assert_eq!(default_message("range"), "is out of range");
        assert_eq!(default_message("custom"), "failed custom check");
    }
}
