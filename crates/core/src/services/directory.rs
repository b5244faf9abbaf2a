//! Read-only listing of users and doctors.

use crate::models::{Doctor, Identity};
use crate::repositories::identity;
use crate::{Database, HospitalError, HospitalResult, RecordId};

#[derive(Clone)]
pub struct UserDirectory {
    db: Database,
}

impl UserDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every user with its role profile.
    pub fn list_users(&self) -> HospitalResult<Vec<Identity>> {
        self.db.with_conn(|conn| {
            identity::list_users(conn)?
                .into_iter()
                .map(|user| {
                    let profile = identity::find_profile(conn, &user)?;
                    Ok(Identity { user, profile })
                })
                .collect()
        })
    }

    pub fn get_user(&self, user_id: RecordId) -> HospitalResult<Identity> {
        self.db.with_conn(|conn| {
            let user = identity::find_user(conn, user_id)?
                .ok_or_else(|| HospitalError::not_found("User not found"))?;
            let profile = identity::find_profile(conn, &user)?;
            Ok(Identity { user, profile })
        })
    }

    pub fn list_doctors(&self) -> HospitalResult<Vec<Doctor>> {
        self.db.with_conn(|conn| identity::list_doctors(conn, false))
    }

    /// Doctors who have logged in and are marked active.
    pub fn list_active_doctors(&self) -> HospitalResult<Vec<Doctor>> {
        self.db.with_conn(|conn| identity::list_doctors(conn, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{CoreConfig, MailConfig};
    use crate::security::SigningAlgorithm;
    use crate::services::{CredentialService, Registration};
    use crate::Role;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn register(credentials: &CredentialService, email: &str, id_number: &str) -> Identity {
        credentials
            .register(Registration {
                full_name: "Test User".into(),
                email: email.into(),
                password: "pa55word".into(),
                id_number: id_number.into(),
                ..Default::default()
            })
            .expect("registration should succeed")
    }

    #[test]
    fn test_directory_lists_users_and_doctors() {
        let db = Database::open_in_memory().unwrap();
        let cfg = Arc::new(
            CoreConfig::new(
                ":memory:".into(),
                "secret".into(),
                SigningAlgorithm::Hs256,
                60,
                1_000,
                MailConfig::default(),
            )
            .unwrap(),
        );
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()));
        let credentials = CredentialService::new(db.clone(), cfg, clock);
        let directory = UserDirectory::new(db);

        let patient = register(&credentials, "pat@example.org", "P-1");
        register(&credentials, "grey@example.org", "DOC-1");
        register(&credentials, "house@example.org", "DOC-2");

        assert_eq!(directory.list_users().unwrap().len(), 3);
        assert_eq!(directory.list_doctors().unwrap().len(), 2);
        assert!(directory.list_active_doctors().unwrap().is_empty());

        credentials.login("grey@example.org", "pa55word").unwrap();
        assert_eq!(directory.list_active_doctors().unwrap().len(), 1);

        let fetched = directory.get_user(patient.user.id).unwrap();
        assert_eq!(fetched.role(), Role::Patient);
        assert!(matches!(
            directory.get_user(RecordId::new()),
            Err(HospitalError::NotFound(_))
        ));
    }
}
