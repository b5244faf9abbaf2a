//! Appointment booking and lifecycle.

use crate::error::ApiResult;
use crate::extract::{parse_id, AuthUser};
use crate::AppState;
use api_shared::{
    AppointmentListRes, BookAppointmentReq, EmergencyReq, ErrorRes, MessageRes,
    UpdateAppointmentReq,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use curasphere_core::Appointment;

#[utoipa::path(
    post,
    path = "/appointment/book",
    request_body = BookAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Malformed date or time", body = ErrorRes),
        (status = 403, description = "Caller is not a patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn book(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<BookAppointmentReq>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let patient_id = caller.patient_id()?;
    let appt = state
        .appointments
        .book(patient_id, &req.appointment_date, &req.appointment_time)?;
    Ok((StatusCode::CREATED, Json(appt)))
}

#[utoipa::path(
    post,
    path = "/appointment/emergency",
    request_body = EmergencyReq,
    responses(
        (status = 201, description = "Emergency raised and broadcast", body = Appointment),
        (status = 400, description = "Missing location", body = ErrorRes),
        (status = 403, description = "Caller is not a patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Raise an emergency, scheduled now. Every connected client is notified.
#[axum::debug_handler]
pub async fn emergency(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<EmergencyReq>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let patient_id = caller.patient_id()?;
    let appt = state.appointments.request_emergency(
        patient_id,
        &req.location,
        &req.description,
        req.urgency_level,
    )?;
    Ok((StatusCode::CREATED, Json(appt)))
}

#[utoipa::path(
    get,
    path = "/appointment/mine",
    responses(
        (status = 200, description = "Appointments the caller is on", body = AppointmentListRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn mine(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<AppointmentListRes>> {
    let records = state.appointments.list(caller.party_id()?)?;
    Ok(Json(AppointmentListRes { records }))
}

#[utoipa::path(
    get,
    path = "/appointment/due",
    responses(
        (status = 200, description = "Today's appointments plus the unfinished backlog", body = AppointmentListRes),
        (status = 403, description = "Caller is not a nurse", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn due(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<AppointmentListRes>> {
    caller.nurse_id()?;
    let records = state.appointments.list_due_for_nurse()?;
    Ok(Json(AppointmentListRes { records }))
}

#[utoipa::path(
    put,
    path = "/appointment/update/{id}",
    request_body = UpdateAppointmentReq,
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment updated", body = Appointment),
        (status = 400, description = "Bad schedule or illegal status change", body = ErrorRes),
        (status = 404, description = "No such appointment for the caller", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateAppointmentReq>,
) -> ApiResult<Json<Appointment>> {
    let appointment_id = parse_id(&id)?;
    let appt = state
        .appointments
        .update(caller.party_id()?, appointment_id, req.into())?;
    Ok(Json(appt))
}

#[utoipa::path(
    delete,
    path = "/appointment/delete/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment and its EHR removed", body = MessageRes),
        (status = 404, description = "No such appointment for the caller", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageRes>> {
    let appointment_id = parse_id(&id)?;
    state.appointments.delete(caller.party_id()?, appointment_id)?;
    Ok(Json(MessageRes::new("Appointment deleted successfully")))
}
