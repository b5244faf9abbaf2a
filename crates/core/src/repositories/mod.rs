//! Row-level storage access.
//!
//! Free functions over a `&Connection`, one module per aggregate. They do no authorisation and
//! publish nothing; the workflow services decide what to call and in which transaction.

pub mod appointments;
pub mod ehr;
pub mod identity;

use rusqlite::ErrorCode;

/// True when `err` is a UNIQUE (or other constraint) violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
