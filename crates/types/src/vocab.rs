//! Closed vocabularies: roles, workflow statuses and appointment classifiers.
//!
//! Each enum has exactly one wire spelling, used for JSON and for the storage column alike.

use crate::TextError;
use std::fmt;
use std::str::FromStr;

macro_rules! vocabulary {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TextError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(TextError::UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// The role a user holds. Chosen once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Patient,
}

vocabulary!(Role, "role", {
    Admin => "admin",
    Doctor => "doctor",
    Nurse => "nurse",
    Patient => "patient",
});

impl Role {
    /// Derives the role from an identification number.
    ///
    /// Staff numbers carry a marker: `doc` for doctors, `nsc` for nurses (case-insensitive).
    /// Everything else registers as a patient. Admins are never derived; they are created
    /// out-of-band.
    pub fn from_identification_number(id_number: &str) -> Self {
        let lowered = id_number.to_ascii_lowercase();
        if lowered.contains("doc") {
            Role::Doctor
        } else if lowered.contains("nsc") {
            Role::Nurse
        } else {
            Role::Patient
        }
    }

    /// Roles whose live connections receive normal-priority workflow events.
    pub fn is_clinical_staff(&self) -> bool {
        matches!(self, Role::Doctor | Role::Nurse)
    }
}

/// Appointment workflow status.
///
/// ```text
/// PENDING -> IN_PROGRESS -> VITALS_RECORDED -> DIAGNOSED -> COMPLETED
///     \____________\_______________\_______________\______-> CANCELED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    InProgress,
    VitalsRecorded,
    Diagnosed,
    Completed,
    Canceled,
}

vocabulary!(AppointmentStatus, "appointment status", {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    VitalsRecorded => "VITALS_RECORDED",
    Diagnosed => "DIAGNOSED",
    Completed => "COMPLETED",
    Canceled => "CANCELED",
});

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Canceled)
    }

    /// Whether the workflow permits moving from `self` to `next`.
    ///
    /// Vitals may be re-recorded and a diagnosis amended; every other self-transition is
    /// rejected, as is any move out of a terminal state.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Canceled) => true,
            (Pending, InProgress) | (Pending, VitalsRecorded) => true,
            (InProgress, VitalsRecorded) => true,
            (VitalsRecorded, VitalsRecorded) | (VitalsRecorded, Diagnosed) => true,
            (Diagnosed, Diagnosed) | (Diagnosed, Completed) => true,
            _ => false,
        }
    }
}

/// EHR status. A strict subset of the appointment workflow; an EHR in a given status implies
/// the appointment status of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EhrStatus {
    InProgress,
    VitalsRecorded,
    Diagnosed,
    Completed,
}

vocabulary!(EhrStatus, "EHR status", {
    InProgress => "IN_PROGRESS",
    VitalsRecorded => "VITALS_RECORDED",
    Diagnosed => "DIAGNOSED",
    Completed => "COMPLETED",
});

impl EhrStatus {
    pub fn appointment_status(&self) -> AppointmentStatus {
        match self {
            EhrStatus::InProgress => AppointmentStatus::InProgress,
            EhrStatus::VitalsRecorded => AppointmentStatus::VitalsRecorded,
            EhrStatus::Diagnosed => AppointmentStatus::Diagnosed,
            EhrStatus::Completed => AppointmentStatus::Completed,
        }
    }
}

impl From<EhrStatus> for AppointmentStatus {
    fn from(status: EhrStatus) -> Self {
        status.appointment_status()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
}

vocabulary!(UrgencyLevel, "urgency level", {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Emergency,
}

vocabulary!(AppointmentType, "appointment type", {
    Consultation => "CONSULTATION",
    FollowUp => "FOLLOW_UP",
    Emergency => "EMERGENCY",
});

/// Doctor availability. Flipped to active when the doctor logs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DoctorStatus {
    Active,
    Inactive,
}

vocabulary!(DoctorStatus, "doctor status", {
    Active => "active",
    Inactive => "inactive",
});
