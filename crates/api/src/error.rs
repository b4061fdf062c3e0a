//! Error taxonomy shared by every handler.
//!
//! An [`AppError`] carries a machine-readable [`ErrorCode`], a client-safe
//! message, optional details, and an optional underlying cause. The code
//! alone decides the HTTP status, and the cause never reaches the client.
//! Subsystem errors convert into `AppError` at the service boundary.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use storeline_core::MoneyError;

use crate::auth::AuthError;
use crate::db::RepositoryError;
use crate::email::EmailError;
use crate::stripe::StripeError;

/// Boxed underlying cause of an [`AppError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Validation,
    BadRequest,
    NotFound,
    Unauthorized,
    Forbidden,
    Internal,
    Database,
    DuplicateEntry,
    ThirdParty,
    TooManyRequests,
    ResourceExhausted,
}

impl ErrorCode {
    /// Wire representation used in the envelope's `error.code`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Internal => "INTERNAL_ERROR",
            Self::Database => "DATABASE_ERROR",
            Self::DuplicateEntry => "DUPLICATE_ENTRY",
            Self::ThirdParty => "THIRD_PARTY_ERROR",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
        }
    }

    /// HTTP status for this category.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal | Self::Database => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DuplicateEntry => StatusCode::CONFLICT,
            Self::ThirdParty => StatusCode::BAD_GATEWAY,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level error returned by handlers and services.
#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    details: Vec<String>,
    source: Option<BoxError>,
}

impl AppError {
    /// Create an error with an explicit code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Database, message)
    }

    #[must_use]
    pub fn duplicate_entry(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateEntry, message)
    }

    #[must_use]
    pub fn third_party(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ThirdParty, message)
    }

    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    #[must_use]
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceExhausted, message)
    }

    /// Append one detail line.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// Append several detail lines.
    #[must_use]
    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    /// Attach the underlying cause. It is logged, never sent to the client.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.code.status()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> &[String] {
        &self.details
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                cause = self.source.as_ref().map(tracing::field::display),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        crate::response::failure(&self)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnsupportedAlgorithm(ref alg) => {
                Self::bad_request(format!("unexpected signing algorithm: {alg}"))
            }
            AuthError::MalformedToken => Self::unauthorized("invalid authorization token"),
            AuthError::Expired | AuthError::InvalidToken(_) => {
                Self::unauthorized("invalid or expired token")
            }
            AuthError::InvalidCredentials => Self::unauthorized("invalid email or password"),
            AuthError::Signing(_) | AuthError::PasswordHash => {
                Self::internal("authentication failure").with_source(err)
            }
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found("resource not found"),
            RepositoryError::Conflict(ref msg) => Self::duplicate_entry(msg.clone()),
            RepositoryError::Timeout => {
                Self::resource_exhausted("database did not respond in time").with_source(err)
            }
            RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                Self::database("database error").with_source(err)
            }
        }
    }
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::MissingSignature => Self::bad_request("missing Stripe-Signature header"),
            StripeError::InvalidSignature(_) => {
                Self::bad_request("invalid webhook signature").with_source(err)
            }
            StripeError::InvalidPayload(_) => {
                Self::bad_request("invalid webhook payload").with_source(err)
            }
            StripeError::Http(_) | StripeError::Api { .. } | StripeError::Parse(_) => {
                Self::third_party("payment provider error").with_source(err)
            }
        }
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::CurrencyMismatch { left, right } => {
                Self::bad_request("cart items must share one currency")
                    .with_detail(format!("cart is in {left}, product is in {right}"))
            }
            MoneyError::OutOfRange => Self::bad_request("amount is out of range"),
        }
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::third_party("email provider error").with_source(err)
    }
}

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractor so captured errors carry the caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
