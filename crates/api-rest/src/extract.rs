//! The authenticated caller, resolved from the bearer token.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::bearer_token;
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use curasphere_core::{HospitalError, Identity, Profile, RecordId};

/// Extractor for protected endpoints. Rejects with 401 when the header is missing or the token
/// does not verify.
pub struct AuthUser(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(HospitalError::Unauthenticated)?;
        let identity = state.credentials.authenticate(token)?;
        Ok(AuthUser(identity))
    }
}

impl AuthUser {
    pub fn patient_id(&self) -> Result<RecordId, ApiError> {
        match &self.0.profile {
            Profile::Patient(patient) => Ok(patient.id),
            _ => Err(HospitalError::forbidden("Only patients can perform this action").into()),
        }
    }

    pub fn nurse_id(&self) -> Result<RecordId, ApiError> {
        match &self.0.profile {
            Profile::Nurse(nurse) => Ok(nurse.id),
            _ => Err(HospitalError::forbidden("Only nurses can perform this action").into()),
        }
    }

    pub fn doctor_id(&self) -> Result<RecordId, ApiError> {
        match &self.0.profile {
            Profile::Doctor(doctor) => Ok(doctor.id),
            _ => Err(HospitalError::forbidden("Only doctors can perform this action").into()),
        }
    }

    /// The caller's profile id. Admins have no profile and cannot own appointments.
    pub fn party_id(&self) -> Result<RecordId, ApiError> {
        self.0
            .profile_id()
            .ok_or_else(|| HospitalError::forbidden("Admins have no appointments").into())
    }
}

/// Parse a path segment as a record id. Malformed ids are a 400.
pub fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    Ok(RecordId::parse(raw).map_err(HospitalError::from)?)
}
