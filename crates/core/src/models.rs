//! Domain records.
//!
//! These are the rows the repositories read and write, and the shapes the API serialises.
//! Secrets (password hash, one-time code) are never serialised.

use crate::{
    AppointmentStatus, AppointmentType, DoctorStatus, EhrStatus, EmailAddress, RecordId, Role,
    UrgencyLevel,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct User {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub username: String,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub otp: Option<String>,
    #[serde(skip)]
    pub otp_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Doctor {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub user_id: RecordId,
    pub full_name: String,
    pub status: DoctorStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Nurse {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub user_id: RecordId,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Patient {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub user_id: RecordId,
    pub full_name: String,
    #[serde(flatten)]
    pub details: PatientDetails,
}

/// Optional demographics captured when a patient registers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, serde::Deserialize, ToSchema)]
pub struct PatientDetails {
    pub age: Option<u32>,
    pub gender: Option<String>,
    #[serde(alias = "current_weight_kg")]
    pub weight_kg: Option<f64>,
    #[serde(alias = "current_height_cm")]
    pub height_cm: Option<f64>,
    pub hospital_card_id: Option<String>,
}

/// The role-specific side of an identity. Exactly one per user.
#[derive(Clone, Debug, PartialEq)]
pub enum Profile {
    Admin,
    Doctor(Doctor),
    Nurse(Nurse),
    Patient(Patient),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Admin => Role::Admin,
            Profile::Doctor(_) => Role::Doctor,
            Profile::Nurse(_) => Role::Nurse,
            Profile::Patient(_) => Role::Patient,
        }
    }

    /// Id of the role row, which is what appointments and EHRs reference. Admins have none.
    pub fn id(&self) -> Option<RecordId> {
        match self {
            Profile::Admin => None,
            Profile::Doctor(d) => Some(d.id),
            Profile::Nurse(n) => Some(n.id),
            Profile::Patient(p) => Some(p.id),
        }
    }

    pub fn full_name(&self) -> Option<&str> {
        match self {
            Profile::Admin => None,
            Profile::Doctor(d) => Some(&d.full_name),
            Profile::Nurse(n) => Some(&n.full_name),
            Profile::Patient(p) => Some(&p.full_name),
        }
    }
}

/// A resolved caller: the user row plus its role profile.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user: User,
    pub profile: Profile,
}

impl Identity {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn profile_id(&self) -> Option<RecordId> {
        self.profile.id()
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self.profile, Profile::Patient(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Appointment {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    pub scheduled_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub urgency_level: UrgencyLevel,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether `party` (a patient or doctor profile id) is on this appointment.
    pub fn involves(&self, party: RecordId) -> bool {
        self.patient_id == party || self.doctor_id == Some(party)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, ToSchema)]
pub struct Vitals {
    /// Body temperature in degrees Celsius.
    pub temperature: f64,
    /// Systolic/diastolic, e.g. `120/80`.
    pub blood_pressure: String,
    /// Beats per minute.
    pub heart_rate: u32,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, ToSchema)]
pub struct Diagnosis {
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub further_tests: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Ehr {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub appointment_id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    #[schema(value_type = Option<String>)]
    pub nurse_id: Option<RecordId>,
    pub temperature: Option<f64>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u32>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub further_tests: Option<String>,
    pub status: EhrStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ehr {
    pub fn is_assigned_to(&self, doctor_id: RecordId) -> bool {
        self.doctor_id == Some(doctor_id)
    }
}
