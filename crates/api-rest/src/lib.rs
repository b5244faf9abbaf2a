//! # API REST
//!
//! REST API for Curasphere.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - bearer-token authentication and role checks at the boundary
//! - the server-sent notification stream
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for request and response bodies. Business rules live in
//! `curasphere-core`; handlers call its services directly.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use curasphere_core::{
    AppointmentService, Clock, CoreConfig, CredentialService, Database, EhrService,
    HospitalResult, LogMailer, Mailer, NotificationBroadcaster, SystemClock, UserDirectory,
};
use handlers::{appointments, auth, ehr, notifications, users};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ApiResult};

/// Shared state for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialService,
    pub appointments: AppointmentService,
    pub ehr: EhrService,
    pub directory: UserDirectory,
    pub broadcaster: NotificationBroadcaster,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        db: Database,
        broadcaster: NotificationBroadcaster,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            credentials: CredentialService::new(db.clone(), cfg, clock.clone()),
            appointments: AppointmentService::new(db.clone(), broadcaster.clone(), clock.clone()),
            ehr: EhrService::new(db.clone(), broadcaster.clone(), clock),
            directory: UserDirectory::new(db),
            broadcaster,
            mailer,
        }
    }

    /// Open the configured database and wire the services with the system clock and the
    /// logging mailer.
    pub fn from_config(cfg: Arc<CoreConfig>) -> HospitalResult<Self> {
        let db = Database::open(cfg.database_url())?;
        let mailer = Arc::new(LogMailer::new(cfg.mail().clone()));
        Ok(Self::new(
            cfg,
            db,
            NotificationBroadcaster::new(),
            Arc::new(SystemClock),
            mailer,
        ))
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        auth::register,
        auth::login,
        auth::forgot_password,
        auth::confirm_otp,
        auth::reset_password,
        auth::me,
        appointments::book,
        appointments::emergency,
        appointments::mine,
        appointments::due,
        appointments::update,
        appointments::delete,
        ehr::initiate,
        ehr::assign,
        ehr::vitals,
        ehr::diagnosis,
        ehr::complete,
        ehr::for_patient,
        ehr::doctor_pending,
        ehr::doctor_all,
        ehr::by_appointment,
        ehr::get,
        users::list,
        users::doctors,
        users::active_doctors,
        users::get,
        notifications::stream,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::MessageRes,
        api_shared::ErrorRes,
        api_shared::RegisterReq,
        api_shared::LoginReq,
        api_shared::ForgotPasswordReq,
        api_shared::ConfirmOtpReq,
        api_shared::ResetPasswordReq,
        api_shared::UserRes,
        api_shared::AuthRes,
        api_shared::UserListRes,
        api_shared::DoctorListRes,
        api_shared::BookAppointmentReq,
        api_shared::EmergencyReq,
        api_shared::UpdateAppointmentReq,
        api_shared::AppointmentListRes,
        api_shared::EhrListRes,
        curasphere_core::Appointment,
        curasphere_core::Ehr,
        curasphere_core::Vitals,
        curasphere_core::Diagnosis,
        curasphere_core::Doctor,
        curasphere_core::Nurse,
        curasphere_core::Patient,
        curasphere_core::Role,
        curasphere_core::AppointmentStatus,
        curasphere_core::AppointmentType,
        curasphere_core::EhrStatus,
        curasphere_core::UrgencyLevel,
        curasphere_core::DoctorStatus,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Build the full application router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/confirm-otp", post(auth::confirm_otp))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/me", get(auth::me))
        .route("/appointment/book", post(appointments::book))
        .route("/appointment/emergency", post(appointments::emergency))
        .route("/appointment/mine", get(appointments::mine))
        .route("/appointment/due", get(appointments::due))
        .route("/appointment/update/:id", put(appointments::update))
        .route("/appointment/delete/:id", delete(appointments::delete))
        .route("/ehr/initiate/:appointment_id", post(ehr::initiate))
        .route("/ehr/assign/:doctor_id/:appointment_id", put(ehr::assign))
        .route("/ehr/vitals/:appointment_id", post(ehr::vitals))
        .route("/ehr/diagnosis/:ehr_id", put(ehr::diagnosis))
        .route("/ehr/complete/:ehr_id", put(ehr::complete))
        .route("/ehr/patient/:patient_id", get(ehr::for_patient))
        .route("/ehr/doctor/pending", get(ehr::doctor_pending))
        .route("/ehr/doctor/all", get(ehr::doctor_all))
        .route("/ehr/appointment/:id", get(ehr::by_appointment))
        .route("/ehr/:id", get(ehr::get))
        .route("/users", get(users::list))
        .route("/users/doctors", get(users::doctors))
        .route("/users/doctors/active", get(users::active_doctors))
        .route("/users/:id", get(users::get))
        .route(
            "/notifications/:client_id/:client_type",
            get(notifications::stream),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
