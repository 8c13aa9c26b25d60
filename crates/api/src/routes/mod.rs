//! API route definitions

pub mod appointments;
pub mod health;
pub mod organizations;
pub mod patients;
pub mod plan;
pub mod records;
pub mod users;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::require_auth, state::AppState};

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        // Organization
        .route(
            "/organization",
            get(organizations::get_organization).patch(organizations::update_organization),
        )
        .route("/organization/stats", get(organizations::get_organization_stats))
        .route("/organization/subscription", get(organizations::get_subscription))
        // Plan limits and usage
        .route("/plan/limits", get(plan::get_plan_limits))
        .route("/plan/usage", get(plan::get_plan_usage))
        .route("/plan/usage/check/:resource", get(plan::check_resource))
        .route("/plan/recommendation", get(plan::get_recommendation))
        // Staff users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            patch(users::update_user).delete(users::deactivate_user),
        )
        // Patients
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route("/patients/export", get(patients::export_patients))
        .route(
            "/patients/:id",
            get(patients::get_patient)
                .patch(patients::update_patient)
                .delete(patients::deactivate_patient),
        )
        // Medical records
        .route(
            "/patients/:id/records",
            get(records::list_records).post(records::create_record),
        )
        .route("/patients/:id/records/:record_id", get(records::get_record))
        // Appointments
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/appointments/:id",
            get(appointments::get_appointment).patch(appointments::update_appointment),
        )
        .route(
            "/appointments/:id/cancel",
            post(appointments::cancel_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1", protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
