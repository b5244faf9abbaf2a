//! Constants used throughout the Curasphere core crate.

/// Default SQLite location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "curasphere.db";

/// Connection string that selects a private in-memory database.
pub const IN_MEMORY_DATABASE_URL: &str = ":memory:";

/// Default access-token lifetime.
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60;

/// PBKDF2 rounds for newly hashed passwords. Stored hashes carry their own round count.
pub const DEFAULT_PASSWORD_HASH_ITERATIONS: u32 = 100_000;

/// Shortest password accepted at registration or reset.
pub const MIN_PASSWORD_LEN: usize = 6;

/// One-time password-reset codes are valid for this long.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Inclusive range of the 6-digit one-time code.
pub const OTP_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// Length of a booked appointment when the caller does not say otherwise.
pub const DEFAULT_APPOINTMENT_DURATION_MINUTES: u32 = 30;

/// Idle notification streams emit a keep-alive marker at this interval.
pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 15;

/// Wall-clock format for appointment times as stored and printed.
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
