use curasphere_ids::IdError;
use curasphere_types::TextError;

/// Every failure a Curasphere service can report.
///
/// The first group is the caller-facing taxonomy; the API layer maps each of those to a fixed
/// HTTP status and returns the `Display` text as the message. The second group is internal and
/// is only ever reported to callers as a generic server error.
#[derive(Debug, thiserror::Error)]
pub enum HospitalError {
    #[error("{0}")]
    DuplicateIdentity(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Could not validate credentials")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid or expired OTP")]
    InvalidOrExpiredCode,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database migration v{version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("token error: {0}")]
    Token(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("failed to serialize: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to send email: {0}")]
    Mail(String),
}

impl HospitalError {
    pub fn not_found(what: impl Into<String>) -> Self {
        HospitalError::NotFound(what.into())
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        HospitalError::Validation(detail.into())
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        HospitalError::Forbidden(detail.into())
    }
}

impl From<TextError> for HospitalError {
    fn from(err: TextError) -> Self {
        HospitalError::Validation(err.to_string())
    }
}

impl From<IdError> for HospitalError {
    fn from(err: IdError) -> Self {
        HospitalError::Validation(err.to_string())
    }
}

pub type HospitalResult<T> = std::result::Result<T, HospitalError>;
