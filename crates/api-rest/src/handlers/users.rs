use crate::error::ApiResult;
use crate::extract::{parse_id, AuthUser};
use crate::AppState;
use api_shared::{DoctorListRes, ErrorRes, UserListRes, UserRes};
use axum::{
    extract::{Path, State},
    Json,
};

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Every registered user", body = UserListRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list(State(state): State<AppState>, _caller: AuthUser) -> ApiResult<Json<UserListRes>> {
    let users = state
        .directory
        .list_users()?
        .into_iter()
        .map(UserRes::from)
        .collect();
    Ok(Json(UserListRes { users }))
}

#[utoipa::path(
    get,
    path = "/users/doctors",
    responses(
        (status = 200, description = "Every doctor", body = DoctorListRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn doctors(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> ApiResult<Json<DoctorListRes>> {
    let doctors = state.directory.list_doctors()?;
    Ok(Json(DoctorListRes { doctors }))
}

#[utoipa::path(
    get,
    path = "/users/doctors/active",
    responses(
        (status = 200, description = "Doctors who have logged in", body = DoctorListRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn active_doctors(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> ApiResult<Json<DoctorListRes>> {
    let doctors = state.directory.list_active_doctors()?;
    Ok(Json(DoctorListRes { doctors }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserRes),
        (status = 404, description = "No such user", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<UserRes>> {
    let identity = state.directory.get_user(parse_id(&id)?)?;
    Ok(Json(identity.into()))
}
