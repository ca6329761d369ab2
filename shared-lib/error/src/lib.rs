//! Common error types for the student management services.
//!
//! Every layer classifies its failures precisely; the request-handling layer
//! turns them into an [`ErrorResponse`] and a status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the request-handling layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Auth(err) => err.status_code(),
            AppError::Conflict(_) => 409,
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Encoding(_)
            | AppError::Config(_)
            | AppError::Repository(_)
            | AppError::Internal(_) => 500,
        }
    }
}

/// Authentication-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token is malformed")]
    Malformed,

    #[error("Token expired")]
    Expired,

    #[error("Token subject does not match")]
    SubjectMismatch,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,
}

impl AuthError {
    /// Every authentication failure is a 401 except an explicit denial.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Forbidden => 403,
            _ => 401,
        }
    }
}

/// Failure to turn a claims payload back into a claim set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("claims segment is not valid base64url")]
    Base64,

    #[error("claims payload is not valid UTF-8")]
    Utf8,

    #[error("claims payload is not a valid claim set: {0}")]
    Structure(String),
}

/// Failure to build a token at issuance time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("claim `{name}` has unsupported value type {kind}")]
    UnsupportedValue { name: String, kind: &'static str },

    #[error("claim `{0}` is reserved")]
    ReservedClaim(String),

    #[error("token lifetime must be positive")]
    NonPositiveLifetime,

    #[error("token lifetime puts expiry beyond the representable date range")]
    LifetimeOutOfRange,

    #[error("failed to serialize token: {0}")]
    Serialization(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Integrity failures detected while verifying a compact token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),

    #[error("token header is missing or names an unsupported algorithm")]
    UnsupportedHeader,

    #[error("signature does not match")]
    Mismatch,

    #[error("signing key is unusable")]
    InvalidKey,
}

impl From<SignatureError> for AuthError {
    fn from(_: SignatureError) -> Self {
        AuthError::BadSignature
    }
}

impl From<DecodeError> for AuthError {
    fn from(_: DecodeError) -> Self {
        AuthError::Malformed
    }
}

/// Startup configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        let (code, message) = match &err {
            AuthError::InvalidCredentials => ("AUTH_INVALID_CREDENTIALS", "Invalid credentials"),
            AuthError::BadSignature => ("AUTH_BAD_SIGNATURE", "Invalid token signature"),
            AuthError::Malformed => ("AUTH_MALFORMED_TOKEN", "Malformed token"),
            AuthError::Expired => ("AUTH_TOKEN_EXPIRED", "Token has expired"),
            AuthError::SubjectMismatch => ("AUTH_SUBJECT_MISMATCH", "Token does not belong to this account"),
            AuthError::Unauthorized => ("AUTH_UNAUTHORIZED", "Unauthorized"),
            AuthError::Forbidden => (
                "AUTH_FORBIDDEN",
                "Access denied: You don't have permission to perform this action.",
            ),
        };
        Self::new(code, message)
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Auth(auth) => auth.into(),
            AppError::Conflict(message) => Self::new("CONFLICT", message),
            AppError::Validation(message) => Self::new("VALIDATION_FAILED", message),
            AppError::NotFound(message) => Self::new("NOT_FOUND", message),
            // Internal details are logged, never sent to the client.
            other @ (AppError::Encoding(_)
            | AppError::Config(_)
            | AppError::Repository(_)
            | AppError::Internal(_)) => {
                tracing::error!(error = %other, "Internal error while handling request");
                Self::new("INTERNAL_ERROR", "Internal server error")
            }
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
