//! EHR endpoints. Nurses open records, take vitals and assign doctors; doctors diagnose and
//! complete.

use crate::error::ApiResult;
use crate::extract::{parse_id, AuthUser};
use crate::AppState;
use api_shared::{EhrListRes, ErrorRes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use curasphere_core::{Diagnosis, Ehr, Vitals};

#[utoipa::path(
    post,
    path = "/ehr/initiate/{appointment_id}",
    params(("appointment_id" = String, Path, description = "Appointment id")),
    responses(
        (status = 201, description = "EHR open for the appointment", body = Ehr),
        (status = 403, description = "Caller is not a nurse", body = ErrorRes),
        (status = 404, description = "No such appointment", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn initiate(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(appointment_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Ehr>)> {
    let nurse_id = caller.nurse_id()?;
    let record = state.ehr.initiate(parse_id(&appointment_id)?, nurse_id)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/ehr/assign/{doctor_id}/{appointment_id}",
    params(
        ("doctor_id" = String, Path, description = "Doctor profile id"),
        ("appointment_id" = String, Path, description = "Appointment id")
    ),
    responses(
        (status = 200, description = "Doctor assigned", body = Ehr),
        (status = 400, description = "Appointment already closed", body = ErrorRes),
        (status = 403, description = "Caller is not a nurse", body = ErrorRes),
        (status = 404, description = "Doctor, appointment or EHR missing", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn assign(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((doctor_id, appointment_id)): Path<(String, String)>,
) -> ApiResult<Json<Ehr>> {
    caller.nurse_id()?;
    let record = state
        .ehr
        .assign_doctor(parse_id(&doctor_id)?, parse_id(&appointment_id)?)?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/ehr/vitals/{appointment_id}",
    request_body = Vitals,
    params(("appointment_id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Vitals recorded", body = Ehr),
        (status = 400, description = "Out-of-range vitals or wrong stage", body = ErrorRes),
        (status = 403, description = "Caller is not a nurse", body = ErrorRes),
        (status = 404, description = "No such appointment", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn vitals(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(appointment_id): Path<String>,
    Json(req): Json<Vitals>,
) -> ApiResult<Json<Ehr>> {
    let nurse_id = caller.nurse_id()?;
    let record = state
        .ehr
        .record_vitals(parse_id(&appointment_id)?, req, nurse_id)?;
    Ok(Json(record))
}

#[utoipa::path(
    put,
    path = "/ehr/diagnosis/{ehr_id}",
    request_body = Diagnosis,
    params(("ehr_id" = String, Path, description = "EHR id")),
    responses(
        (status = 200, description = "Diagnosis saved", body = Ehr),
        (status = 400, description = "Blank diagnosis or wrong stage", body = ErrorRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes),
        (status = 404, description = "EHR missing or caller is not the assigned doctor", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn diagnosis(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(ehr_id): Path<String>,
    Json(req): Json<Diagnosis>,
) -> ApiResult<Json<Ehr>> {
    let doctor_id = caller.doctor_id()?;
    let record = state
        .ehr
        .update_diagnosis(parse_id(&ehr_id)?, doctor_id, req)?;
    Ok(Json(record))
}

#[utoipa::path(
    put,
    path = "/ehr/complete/{ehr_id}",
    params(("ehr_id" = String, Path, description = "EHR id")),
    responses(
        (status = 200, description = "EHR completed", body = Ehr),
        (status = 400, description = "EHR not diagnosed yet", body = ErrorRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes),
        (status = 404, description = "EHR missing or caller is not the assigned doctor", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn complete(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(ehr_id): Path<String>,
) -> ApiResult<Json<Ehr>> {
    let doctor_id = caller.doctor_id()?;
    let record = state.ehr.complete(parse_id(&ehr_id)?, doctor_id)?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/ehr/patient/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient profile id")),
    responses(
        (status = 200, description = "All EHRs for the patient", body = EhrListRes),
        (status = 404, description = "Patient hidden from the caller", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn for_patient(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<EhrListRes>> {
    let records = state
        .ehr
        .list_for_patient(&viewer, parse_id(&patient_id)?)?;
    Ok(Json(EhrListRes { records }))
}

#[utoipa::path(
    get,
    path = "/ehr/doctor/pending",
    responses(
        (status = 200, description = "Assigned EHRs awaiting diagnosis", body = EhrListRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn doctor_pending(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<EhrListRes>> {
    let records = state.ehr.pending_for_doctor(caller.doctor_id()?)?;
    Ok(Json(EhrListRes { records }))
}

#[utoipa::path(
    get,
    path = "/ehr/doctor/all",
    responses(
        (status = 200, description = "Every EHR assigned to the caller", body = EhrListRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn doctor_all(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<EhrListRes>> {
    let records = state.ehr.list_for_doctor(caller.doctor_id()?)?;
    Ok(Json(EhrListRes { records }))
}

#[utoipa::path(
    get,
    path = "/ehr/appointment/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment's EHR", body = Ehr),
        (status = 404, description = "No EHR visible to the caller", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn by_appointment(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ehr>> {
    Ok(Json(state.ehr.get_by_appointment(&viewer, parse_id(&id)?)?))
}

#[utoipa::path(
    get,
    path = "/ehr/{id}",
    params(("id" = String, Path, description = "EHR id")),
    responses(
        (status = 200, description = "The EHR", body = Ehr),
        (status = 404, description = "No EHR visible to the caller", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ehr>> {
    Ok(Json(state.ehr.get(&viewer, parse_id(&id)?)?))
}
