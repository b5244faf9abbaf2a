//! # Curasphere Core
//!
//! Business logic for the Curasphere hospital backend:
//! - identity, registration, login and password reset ([`CredentialService`])
//! - appointment booking and lifecycle ([`AppointmentService`])
//! - EHR progression from vitals to completion ([`EhrService`])
//! - live notification fan-out ([`NotificationBroadcaster`])
//!
//! Storage is SQLite behind [`Database`]. **No API concerns**: HTTP routing, request parsing and
//! role checks at the boundary belong in `api-rest` and `api-shared`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod mail;
pub mod models;
pub mod notifications;
pub mod repositories;
pub mod security;
pub mod services;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CoreConfig, MailConfig};
pub use db::Database;
pub use error::{HospitalError, HospitalResult};
pub use mail::{EmailMessage, LogMailer, Mailer};
pub use models::{
    Appointment, Diagnosis, Doctor, Ehr, Identity, Nurse, Patient, PatientDetails, Profile, User,
    Vitals,
};
pub use notifications::{Notification, NotificationBroadcaster, Priority, StreamItem, Subscription};
pub use services::{
    AppointmentService, AppointmentUpdate, CredentialService, EhrService, LoginOutcome,
    Registration, ResetCode, UserDirectory,
};

pub use curasphere_ids::{IdError, RecordId};
pub use curasphere_types::{
    AppointmentStatus, AppointmentType, DoctorStatus, EhrStatus, EmailAddress, NonEmptyText, Role,
    TextError, UrgencyLevel,
};
