//! Registration, login and password reset.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::constants::{OTP_RANGE, OTP_TTL_MINUTES};
use crate::models::{Doctor, Identity, Nurse, Patient, PatientDetails, Profile, User};
use crate::repositories::identity;
use crate::security::{PasswordHasher, TokenSigner};
use crate::validation::validate_password;
use crate::{
    Database, DoctorStatus, EmailAddress, HospitalError, HospitalResult, NonEmptyText, RecordId,
    Role,
};
use chrono::Duration;
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Everything a new user supplies at sign-up.
#[derive(Clone, Debug, Default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    /// Hospital identification number. Becomes the username and decides the role.
    pub id_number: String,
    /// Only kept for patients.
    pub details: PatientDetails,
}

/// A successful login: the signed access token and who it belongs to.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub identity: Identity,
}

/// A freshly issued one-time code, ready to be mailed.
#[derive(Clone, Debug)]
pub struct ResetCode {
    pub email: EmailAddress,
    pub code: String,
}

#[derive(Clone)]
pub struct CredentialService {
    db: Database,
    hasher: PasswordHasher,
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
}

impl CredentialService {
    pub fn new(db: Database, cfg: Arc<CoreConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            hasher: PasswordHasher::new(cfg.password_hash_iterations()),
            signer: TokenSigner::new(cfg.secret_key(), cfg.algorithm(), cfg.access_token_ttl()),
            clock,
        }
    }

    /// Registers a new user together with its role profile.
    ///
    /// The role is derived from the identification number (see
    /// [`Role::from_identification_number`]). The user row and the profile row are written in one
    /// transaction, so a failure creating the profile leaves no user behind.
    ///
    /// # Errors
    ///
    /// - [`HospitalError::Validation`] if the name or identification number is blank, the email is
    ///   malformed, or the password is too short.
    /// - [`HospitalError::DuplicateIdentity`] if the email or identification number is taken.
    pub fn register(&self, registration: Registration) -> HospitalResult<Identity> {
        let full_name = NonEmptyText::new(&registration.full_name)
            .map_err(|_| HospitalError::validation("Full name is required"))?;
        let id_number = NonEmptyText::new(&registration.id_number)
            .map_err(|_| HospitalError::validation("Identification number is required"))?;
        let email = EmailAddress::parse(&registration.email)?;
        validate_password(&registration.password)?;

        let role = Role::from_identification_number(id_number.as_str());
        let password_hash = self.hasher.hash(&registration.password);
        let now = self.clock.now();

        let user = User {
            id: RecordId::new(),
            username: id_number.into_inner(),
            email,
            role,
            password_hash,
            otp: None,
            otp_expiry: None,
            created_at: now,
            updated_at: now,
        };
        let profile = new_profile(role, user.id, full_name.into_inner(), registration.details);

        self.db.transaction(|tx| {
            if identity::find_user_by_email(tx, &user.email)?.is_some() {
                return Err(HospitalError::DuplicateIdentity(
                    "Email already registered".into(),
                ));
            }
            if identity::find_user_by_username(tx, &user.username)?.is_some() {
                return Err(HospitalError::DuplicateIdentity(
                    "Identification number already registered".into(),
                ));
            }
            identity::insert_user(tx, &user)?;
            identity::insert_profile(tx, &profile)
        })?;

        tracing::info!(user_id = %user.id, %role, "registered user");
        Ok(Identity { user, profile })
    }

    /// Create an administrator account. Admins have no role profile and are never created
    /// through self-registration.
    pub fn create_admin(&self, email: &str, password: &str, username: &str) -> HospitalResult<User> {
        let email = EmailAddress::parse(email)?;
        let username = NonEmptyText::new(username)
            .map_err(|_| HospitalError::validation("Username is required"))?;
        validate_password(password)?;

        let now = self.clock.now();
        let user = User {
            id: RecordId::new(),
            username: username.into_inner(),
            email,
            role: Role::Admin,
            password_hash: self.hasher.hash(password),
            otp: None,
            otp_expiry: None,
            created_at: now,
            updated_at: now,
        };
        self.db.with_conn(|conn| identity::insert_user(conn, &user))?;

        tracing::info!(user_id = %user.id, "created admin");
        Ok(user)
    }

    /// Checks an email/password pair and issues an access token.
    ///
    /// Doctors are marked active when they log in.
    ///
    /// # Errors
    ///
    /// [`HospitalError::InvalidCredentials`] whether the email is unknown or the password is
    /// wrong; the two cases are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> HospitalResult<LoginOutcome> {
        let Ok(email) = EmailAddress::parse(email) else {
            return Err(HospitalError::InvalidCredentials);
        };

        let user = self
            .db
            .with_conn(|conn| identity::find_user_by_email(conn, &email))?
            .ok_or(HospitalError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(HospitalError::InvalidCredentials);
        }

        let mut profile = self
            .db
            .with_conn(|conn| identity::find_profile(conn, &user))?;
        if let Profile::Doctor(doctor) = &mut profile {
            self.db
                .with_conn(|conn| identity::set_doctor_status(conn, doctor.id, DoctorStatus::Active))?;
            doctor.status = DoctorStatus::Active;
        }

        let access_token = self.signer.sign(user.id, self.clock.now())?;
        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");

        Ok(LoginOutcome {
            access_token,
            identity: Identity { user, profile },
        })
    }

    /// Issues a six-digit one-time code valid for ten minutes.
    ///
    /// # Errors
    ///
    /// [`HospitalError::NotFound`] if no user has this email.
    pub fn forgot_password(&self, email: &str) -> HospitalResult<ResetCode> {
        let email = EmailAddress::parse(email)?;
        let code = rand::thread_rng().gen_range(OTP_RANGE).to_string();
        let now = self.clock.now();
        let expiry = now + Duration::minutes(OTP_TTL_MINUTES);

        self.db.with_conn(|conn| {
            let user = identity::find_user_by_email(conn, &email)?
                .ok_or_else(|| HospitalError::not_found("User not found"))?;
            identity::set_otp(conn, user.id, &code, expiry, now)
        })?;

        tracing::info!(%email, "issued password reset code");
        Ok(ResetCode { email, code })
    }

    /// Checks a one-time code without consuming it.
    pub fn confirm_otp(&self, email: &str, code: &str) -> HospitalResult<()> {
        self.db.with_conn(|conn| self.check_code(conn, email, code))?;
        Ok(())
    }

    /// Replaces the password after checking the one-time code, then clears the code.
    ///
    /// # Errors
    ///
    /// [`HospitalError::InvalidOrExpiredCode`] as for [`confirm_otp`](Self::confirm_otp);
    /// [`HospitalError::Validation`] if the new password is too short.
    pub fn reset_password(&self, email: &str, code: &str, new_password: &str) -> HospitalResult<()> {
        validate_password(new_password)?;
        let password_hash = self.hasher.hash(new_password);
        let now = self.clock.now();

        let user_id = self.db.transaction(|tx| {
            let user = self.check_code(tx, email, code)?;
            identity::update_password(tx, user.id, &password_hash, now)?;
            Ok(user.id)
        })?;

        tracing::info!(%user_id, "password reset");
        Ok(())
    }

    /// Resolves a bearer token to the calling identity.
    ///
    /// # Errors
    ///
    /// [`HospitalError::Unauthenticated`] for a bad, expired or orphaned token.
    pub fn authenticate(&self, token: &str) -> HospitalResult<Identity> {
        let claims = self.signer.verify(token, self.clock.now())?;
        let user_id = RecordId::parse(&claims.sub).map_err(|_| HospitalError::Unauthenticated)?;

        self.db.with_conn(|conn| {
            let user = identity::find_user(conn, user_id)?.ok_or(HospitalError::Unauthenticated)?;
            let profile = identity::find_profile(conn, &user)?;
            Ok(Identity { user, profile })
        })
    }

    fn check_code(&self, conn: &rusqlite::Connection, email: &str, code: &str) -> HospitalResult<User> {
        let email = EmailAddress::parse(email).map_err(|_| HospitalError::InvalidOrExpiredCode)?;
        let user = identity::find_user_by_email(conn, &email)?
            .ok_or(HospitalError::InvalidOrExpiredCode)?;

        let (Some(stored), Some(expiry)) = (user.otp.as_deref(), user.otp_expiry) else {
            return Err(HospitalError::InvalidOrExpiredCode);
        };
        let matches: bool = stored.as_bytes().ct_eq(code.trim().as_bytes()).into();
        if !matches || self.clock.now() > expiry {
            tracing::debug!(user_id = %user.id, "rejected one-time code");
            return Err(HospitalError::InvalidOrExpiredCode);
        }
        Ok(user)
    }
}

fn new_profile(role: Role, user_id: RecordId, full_name: String, details: PatientDetails) -> Profile {
    match role {
        Role::Admin => Profile::Admin,
        Role::Doctor => Profile::Doctor(Doctor {
            id: RecordId::new(),
            user_id,
            full_name,
            status: DoctorStatus::Inactive,
        }),
        Role::Nurse => Profile::Nurse(Nurse {
            id: RecordId::new(),
            user_id,
            full_name,
        }),
        Role::Patient => Profile::Patient(Patient {
            id: RecordId::new(),
            user_id,
            full_name,
            details,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::MailConfig;
    use crate::security::SigningAlgorithm;
    use chrono::{TimeZone, Utc};

    struct Harness {
        db: Database,
        clock: Arc<ManualClock>,
        service: CredentialService,
    }

    fn harness() -> Harness {
        let db = Database::open_in_memory().expect("in-memory database");
        let cfg = Arc::new(
            CoreConfig::new(
                ":memory:".into(),
                "test-secret".into(),
                SigningAlgorithm::Hs256,
                60,
                1_000,
                MailConfig::default(),
            )
            .expect("valid config"),
        );
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let service = CredentialService::new(db.clone(), cfg, clock.clone());
        Harness { db, clock, service }
    }

    fn registration(email: &str, id_number: &str) -> Registration {
        Registration {
            full_name: "Ada Lovelace".into(),
            email: email.into(),
            password: "pa55word".into(),
            id_number: id_number.into(),
            details: PatientDetails::default(),
        }
    }

    fn user_count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .expect("count users")
    }

    #[test]
    fn test_register_derives_role_from_id_number() {
        let h = harness();

        let doctor = h.service.register(registration("doc@example.org", "DOC-001")).unwrap();
        let nurse = h.service.register(registration("nurse@example.org", "nsc-17")).unwrap();
        let patient = h.service.register(registration("pat@example.org", "P-123")).unwrap();

        assert_eq!(doctor.role(), Role::Doctor);
        assert_eq!(nurse.role(), Role::Nurse);
        assert_eq!(patient.role(), Role::Patient);
        assert_eq!(patient.user.username, "P-123");
        assert!(matches!(
            &doctor.profile,
            Profile::Doctor(d) if d.status == DoctorStatus::Inactive
        ));
    }

    #[test]
    fn test_duplicate_email_leaves_first_user_intact() {
        let h = harness();
        let first = h.service.register(registration("ada@example.org", "P-1")).unwrap();

        let err = h
            .service
            .register(registration("ADA@example.org", "P-2"))
            .expect_err("duplicate email should fail");
        assert!(matches!(err, HospitalError::DuplicateIdentity(_)));

        let err = h
            .service
            .register(registration("other@example.org", "P-1"))
            .expect_err("duplicate id number should fail");
        assert!(matches!(err, HospitalError::DuplicateIdentity(_)));

        assert_eq!(user_count(&h.db), 1);
        let login = h.service.login("ada@example.org", "pa55word").expect("first user still logs in");
        assert_eq!(login.identity.user.id, first.user.id);
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let h = harness();
        let mut short = registration("ada@example.org", "P-1");
        short.password = "abc".into();
        let mut blank = registration("ada@example.org", "P-1");
        blank.full_name = "   ".into();
        let bad_email = registration("not-an-email", "P-1");

        for input in [short, blank, bad_email] {
            assert!(matches!(
                h.service.register(input),
                Err(HospitalError::Validation(_))
            ));
        }
        assert_eq!(user_count(&h.db), 0);
    }

    #[test]
    fn test_registration_rolls_back_when_profile_insert_fails() {
        let h = harness();
        h.db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE patients")?;
            Ok(())
        })
        .unwrap();

        let err = h
            .service
            .register(registration("ada@example.org", "P-1"))
            .expect_err("profile insert should fail");
        assert!(matches!(err, HospitalError::Database(_)));
        assert_eq!(user_count(&h.db), 0, "user row should have been rolled back");
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let h = harness();
        h.service.register(registration("ada@example.org", "P-1")).unwrap();

        let wrong_password = h.service.login("ada@example.org", "nope-nope").unwrap_err();
        let unknown_email = h.service.login("bob@example.org", "pa55word").unwrap_err();

        assert!(matches!(wrong_password, HospitalError::InvalidCredentials));
        assert!(matches!(unknown_email, HospitalError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn test_login_issues_token_and_activates_doctor() {
        let h = harness();
        h.service.register(registration("doc@example.org", "DOC-1")).unwrap();

        let login = h.service.login("doc@example.org", "pa55word").expect("should log in");
        assert!(matches!(
            &login.identity.profile,
            Profile::Doctor(d) if d.status == DoctorStatus::Active
        ));

        let identity = h.service.authenticate(&login.access_token).expect("token should verify");
        assert_eq!(identity.user.id, login.identity.user.id);
        assert!(matches!(
            identity.profile,
            Profile::Doctor(d) if d.status == DoctorStatus::Active
        ));
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let h = harness();
        h.service.register(registration("ada@example.org", "P-1")).unwrap();
        let login = h.service.login("ada@example.org", "pa55word").unwrap();

        h.clock.advance(Duration::minutes(61));
        assert!(matches!(
            h.service.authenticate(&login.access_token),
            Err(HospitalError::Unauthenticated)
        ));
    }

    #[test]
    fn test_reset_password_consumes_code() {
        let h = harness();
        h.service.register(registration("ada@example.org", "P-1")).unwrap();

        let issued = h.service.forgot_password("ada@example.org").expect("code issued");
        let code: u32 = issued.code.parse().expect("numeric code");
        assert!(OTP_RANGE.contains(&code));

        h.service.confirm_otp("ada@example.org", &issued.code).expect("code confirms");
        h.service
            .reset_password("ada@example.org", &issued.code, "new-secret")
            .expect("reset succeeds");

        assert!(h.service.login("ada@example.org", "new-secret").is_ok());
        assert!(matches!(
            h.service.confirm_otp("ada@example.org", &issued.code),
            Err(HospitalError::InvalidOrExpiredCode)
        ));
        assert!(matches!(
            h.service.reset_password("ada@example.org", &issued.code, "another-one"),
            Err(HospitalError::InvalidOrExpiredCode)
        ));
    }

    #[test]
    fn test_code_expires_after_ten_minutes() {
        let h = harness();
        h.service.register(registration("ada@example.org", "P-1")).unwrap();
        let issued = h.service.forgot_password("ada@example.org").unwrap();

        h.clock.advance(Duration::minutes(10) + Duration::seconds(1));
        assert!(matches!(
            h.service.confirm_otp("ada@example.org", &issued.code),
            Err(HospitalError::InvalidOrExpiredCode)
        ));
    }

    #[test]
    fn test_wrong_code_and_unknown_user() {
        let h = harness();
        h.service.register(registration("ada@example.org", "P-1")).unwrap();

        assert!(matches!(
            h.service.confirm_otp("ada@example.org", "000000"),
            Err(HospitalError::InvalidOrExpiredCode)
        ));
        assert!(matches!(
            h.service.forgot_password("bob@example.org"),
            Err(HospitalError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_admin() {
        let h = harness();
        let admin = h
            .service
            .create_admin("root@example.org", "pa55word", "root")
            .expect("admin created");
        assert_eq!(admin.role, Role::Admin);

        let login = h.service.login("root@example.org", "pa55word").unwrap();
        assert_eq!(login.identity.profile, Profile::Admin);
    }
}
