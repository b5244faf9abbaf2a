//! Record identifiers.
//!
//! Every Curasphere row (users, profiles, appointments, EHRs) is keyed by a v4 UUID rendered in
//! a *canonical* form: **32 lowercase hexadecimal characters**, no hyphens.
//!
//! - [`RecordId::new`] allocates a fresh identifier.
//! - [`RecordId::parse`] validates an identifier supplied from outside (path parameters, token
//!   subjects, CLI arguments). Non-canonical values (uppercase, hyphenated, wrong length,
//!   non-hex) are rejected rather than normalised, so one record never has two spellings.
//!
//! Example: `550e8400e29b41d4a716446655440000`

mod record_id;

pub use record_id::RecordId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
