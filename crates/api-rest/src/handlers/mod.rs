pub mod appointments;
pub mod auth;
pub mod ehr;
pub mod notifications;
pub mod users;

use crate::AppState;
use api_shared::{HealthRes, HealthService};
use axum::{extract::State, Json};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness probe for monitoring and load balancers.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}
