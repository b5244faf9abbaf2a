//! Registration, login and password reset.

use crate::error::{run_blocking, ApiResult};
use crate::extract::AuthUser;
use crate::AppState;
use api_shared::{
    AuthRes, ConfirmOtpReq, ErrorRes, ForgotPasswordReq, LoginReq, MessageRes, RegisterReq,
    ResetPasswordReq, UserRes,
};
use axum::{extract::State, http::StatusCode, Json};
use curasphere_core::EmailMessage;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = UserRes),
        (status = 400, description = "Duplicate or invalid registration", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a user. The identification number decides the role.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> ApiResult<(StatusCode, Json<UserRes>)> {
    let credentials = state.credentials.clone();
    let identity = run_blocking(move || credentials.register(req.into())).await?;
    Ok((StatusCode::CREATED, Json(identity.into())))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Bearer token and caller profile", body = AuthRes),
        (status = 401, description = "Invalid credentials", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> ApiResult<Json<AuthRes>> {
    let credentials = state.credentials.clone();
    let outcome = run_blocking(move || credentials.login(&req.email, &req.password)).await?;
    Ok(Json(AuthRes::bearer(
        outcome.access_token,
        outcome.identity.into(),
    )))
}

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordReq,
    responses(
        (status = 200, description = "Reset code sent", body = MessageRes),
        (status = 404, description = "No user with that email", body = ErrorRes)
    )
)]
/// Issue a one-time reset code and email it in the background.
///
/// The response does not wait for delivery; mail failures are logged only.
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordReq>,
) -> ApiResult<Json<MessageRes>> {
    let reset = state.credentials.forgot_password(&req.email)?;
    let message = EmailMessage::forgot_password(reset.email, &reset.code);
    let mailer = state.mailer.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = mailer.send(&message) {
            tracing::error!("Forgot password email error: {:?}", e);
        }
    });
    Ok(Json(MessageRes::new("OTP sent to your email")))
}

#[utoipa::path(
    post,
    path = "/auth/confirm-otp",
    request_body = ConfirmOtpReq,
    responses(
        (status = 200, description = "Code is valid", body = MessageRes),
        (status = 400, description = "Invalid or expired code", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn confirm_otp(
    State(state): State<AppState>,
    Json(req): Json<ConfirmOtpReq>,
) -> ApiResult<Json<MessageRes>> {
    state.credentials.confirm_otp(&req.email, &req.otp)?;
    Ok(Json(MessageRes::new("OTP confirmed")))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordReq,
    responses(
        (status = 200, description = "Password replaced", body = MessageRes),
        (status = 400, description = "Invalid or expired code, or weak password", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordReq>,
) -> ApiResult<Json<MessageRes>> {
    let credentials = state.credentials.clone();
    run_blocking(move || credentials.reset_password(&req.email, &req.otp, &req.new_password))
        .await?;
    Ok(Json(MessageRes::new("Password reset successfully")))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The caller", body = UserRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler(state = AppState)]
pub async fn me(AuthUser(identity): AuthUser) -> Json<UserRes> {
    Json(identity.into())
}
