//! Request and response bodies.
//!
//! Request types deserialize from JSON and convert into core inputs; response types wrap core
//! records. All of them carry OpenAPI schemas.

use chrono::{DateTime, Utc};
use curasphere_core::{
    Appointment, AppointmentStatus, AppointmentUpdate, Doctor, Ehr, EmailAddress, Identity, Nurse,
    Patient, PatientDetails, Profile, RecordId, Registration, Role, UrgencyLevel,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub full_name: String,
    pub email: String,
    pub password: String,
    /// Staff numbers containing `DOC` register doctors, `NSC` nurses; anything else a patient.
    #[serde(alias = "id_number")]
    pub identification_number: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, alias = "weight_kg")]
    pub current_weight_kg: Option<f64>,
    #[serde(default, alias = "height_cm")]
    pub current_height_cm: Option<f64>,
    #[serde(default)]
    pub hospital_card_id: Option<String>,
}

impl From<RegisterReq> for Registration {
    fn from(req: RegisterReq) -> Self {
        Registration {
            full_name: req.full_name,
            email: req.email,
            password: req.password,
            id_number: req.identification_number,
            details: PatientDetails {
                age: req.age,
                gender: req.gender,
                weight_kg: req.current_weight_kg,
                height_cm: req.current_height_cm,
                hospital_card_id: req.hospital_card_id,
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordReq {
    pub email: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ConfirmOtpReq {
    pub email: String,
    pub otp: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ResetPasswordReq {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// The caller as returned by login and `/auth/me`. Exactly one of the profile fields is set,
/// except for admins, who have none.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserRes {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub username: String,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub doctor: Option<Doctor>,
    pub nurse: Option<Nurse>,
    pub patient: Option<Patient>,
}

impl From<Identity> for UserRes {
    fn from(identity: Identity) -> Self {
        let (doctor, nurse, patient) = match identity.profile {
            Profile::Admin => (None, None, None),
            Profile::Doctor(d) => (Some(d), None, None),
            Profile::Nurse(n) => (None, Some(n), None),
            Profile::Patient(p) => (None, None, Some(p)),
        };
        let user = identity.user;
        UserRes {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            doctor,
            nurse,
            patient,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AuthRes {
    pub access_token: String,
    pub token_type: String,
    pub user: UserRes,
}

impl AuthRes {
    pub fn bearer(access_token: String, user: UserRes) -> Self {
        Self {
            access_token,
            token_type: "bearer".into(),
            user,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserListRes {
    pub users: Vec<UserRes>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DoctorListRes {
    pub doctors: Vec<Doctor>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct BookAppointmentReq {
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    /// `HH:MM`
    pub appointment_time: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct EmergencyReq {
    pub location: String,
    pub description: String,
    pub urgency_level: UrgencyLevel,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAppointmentReq {
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

impl From<UpdateAppointmentReq> for AppointmentUpdate {
    fn from(req: UpdateAppointmentReq) -> Self {
        AppointmentUpdate {
            appointment_date: req.appointment_date,
            appointment_time: req.appointment_time,
            status: req.status,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AppointmentListRes {
    pub records: Vec<Appointment>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct EhrListRes {
    pub records: Vec<Ehr>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use curasphere_core::{DoctorStatus, User};

    #[test]
    fn test_register_req_accepts_both_field_spellings() {
        let req: RegisterReq = serde_json::from_value(serde_json::json!({
            "full_name": "Ada Lovelace",
            "email": "ada@example.org",
            "password": "pa55word",
            "id_number": "P-1",
            "weight_kg": 61.5
        }))
        .expect("should deserialize");

        let registration = Registration::from(req);
        assert_eq!(registration.id_number, "P-1");
        assert_eq!(registration.details.weight_kg, Some(61.5));
        assert_eq!(registration.details.age, None);
    }

    #[test]
    fn test_user_res_hides_secrets_and_carries_profile() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let user = User {
            id: RecordId::new(),
            username: "DOC-1".into(),
            email: EmailAddress::parse("grey@example.org").unwrap(),
            role: Role::Doctor,
            password_hash: "pbkdf2-sha256$1$x$y".into(),
            otp: Some("123456".into()),
            otp_expiry: Some(now),
            created_at: now,
            updated_at: now,
        };
        let doctor = Doctor {
            id: RecordId::new(),
            user_id: user.id,
            full_name: "Dr Grey".into(),
            status: DoctorStatus::Active,
        };

        let res = UserRes::from(Identity {
            user,
            profile: Profile::Doctor(doctor),
        });
        let json = serde_json::to_string(&res).unwrap();

        assert!(!json.contains("pbkdf2"));
        assert!(!json.contains("123456"));
        assert!(json.contains("\"full_name\":\"Dr Grey\""));
        assert!(json.contains("\"role\":\"doctor\""));
        assert!(res.patient.is_none());
    }

    #[test]
    fn test_update_req_defaults_to_no_change() {
        let req: UpdateAppointmentReq =
            serde_json::from_value(serde_json::json!({ "status": "CANCELED" })).unwrap();
        let update = AppointmentUpdate::from(req);
        assert_eq!(update.status, Some(AppointmentStatus::Canceled));
        assert!(update.appointment_date.is_none());
    }
}
