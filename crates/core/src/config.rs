//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Services never read environment variables while handling a request.
//!
//! [`CoreConfig::from_lookup`] takes a lookup function rather than reading `std::env` itself,
//! so binaries pass `|key| std::env::var(key).ok()` and tests pass a map.

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES, DEFAULT_DATABASE_URL, DEFAULT_PASSWORD_HASH_ITERATIONS,
};
use crate::security::SigningAlgorithm;
use crate::{HospitalError, HospitalResult};
use chrono::Duration;
use std::fmt;

/// Outbound mail settings. Every field is optional; an unconfigured mailer only logs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    pub smtp_tls: bool,
}

/// Core configuration resolved at startup.
#[derive(Clone)]
pub struct CoreConfig {
    database_url: String,
    secret_key: String,
    algorithm: SigningAlgorithm,
    access_token_ttl: Duration,
    password_hash_iterations: u32,
    mail: MailConfig,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`HospitalError::InvalidInput`] if the secret is empty, the token lifetime is not
    /// positive, or the hash iteration count is zero.
    pub fn new(
        database_url: String,
        secret_key: String,
        algorithm: SigningAlgorithm,
        access_token_expire_minutes: i64,
        password_hash_iterations: u32,
        mail: MailConfig,
    ) -> HospitalResult<Self> {
        if secret_key.trim().is_empty() {
            return Err(HospitalError::InvalidInput(
                "SECRET_KEY cannot be empty".into(),
            ));
        }
        if access_token_expire_minutes <= 0 {
            return Err(HospitalError::InvalidInput(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive".into(),
            ));
        }
        if password_hash_iterations == 0 {
            return Err(HospitalError::InvalidInput(
                "PASSWORD_HASH_ITERATIONS must be positive".into(),
            ));
        }

        Ok(Self {
            database_url,
            secret_key,
            algorithm,
            access_token_ttl: Duration::minutes(access_token_expire_minutes),
            password_hash_iterations,
            mail,
        })
    }

    /// Resolve the configuration from a key lookup (normally the process environment).
    pub fn from_lookup<F>(lookup: F) -> HospitalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = value("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let secret_key = value("SECRET_KEY")
            .ok_or_else(|| HospitalError::InvalidInput("SECRET_KEY must be set".into()))?;
        let algorithm = value("ALGORITHM")
            .map(|v| v.parse::<SigningAlgorithm>())
            .transpose()?
            .unwrap_or_default();
        let ttl = parse_number("ACCESS_TOKEN_EXPIRE_MINUTES", value("ACCESS_TOKEN_EXPIRE_MINUTES"))?
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES);
        let iterations = parse_number("PASSWORD_HASH_ITERATIONS", value("PASSWORD_HASH_ITERATIONS"))?
            .unwrap_or(DEFAULT_PASSWORD_HASH_ITERATIONS);

        let mail = MailConfig {
            smtp_host: value("SMTP_HOST"),
            smtp_port: parse_number("SMTP_PORT", value("SMTP_PORT"))?,
            smtp_user: value("SMTP_USER"),
            smtp_password: value("SMTP_PASSWORD"),
            from_address: value("EMAILS_FROM_EMAIL"),
            smtp_tls: parse_bool("SMTP_TLS", value("SMTP_TLS"))?.unwrap_or(false),
        };

        Self::new(database_url, secret_key, algorithm, ttl, iterations, mail)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn secret_key(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    pub fn password_hash_iterations(&self) -> u32 {
        self.password_hash_iterations
    }

    pub fn mail(&self) -> &MailConfig {
        &self.mail
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_url", &self.database_url)
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("password_hash_iterations", &self.password_hash_iterations)
            .field("mail", &self.mail.smtp_host)
            .finish()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>) -> HospitalResult<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| HospitalError::InvalidInput(format!("{key} is not a valid number: '{v}'")))
        })
        .transpose()
}

fn parse_bool(key: &str, value: Option<String>) -> HospitalResult<Option<bool>> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(HospitalError::InvalidInput(format!(
                "{key} is not a valid boolean: '{v}'"
            ))),
        })
        .transpose()
}

/// Resolve a SQLite connection string to a filesystem path.
///
/// Accepts a bare path, `:memory:`, or the `sqlite:///relative.db` / `sqlite:////abs.db` URL
/// forms. Returns `None` for the in-memory database.
pub fn sqlite_path_from_url(url: &str) -> Option<&str> {
    let path = url
        .strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    if path.is_empty() || path == crate::constants::IN_MEMORY_DATABASE_URL {
        None
    } else {
        Some(path)
    }
}
