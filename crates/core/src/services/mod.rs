//! Workflow services. Each owns a [`Database`](crate::Database) handle and is cheap to clone.

mod appointments;
mod credentials;
mod directory;
mod ehr;

pub use appointments::{AppointmentService, AppointmentUpdate};
pub use credentials::{CredentialService, LoginOutcome, Registration, ResetCode};
pub use directory::UserDirectory;
pub use ehr::EhrService;
