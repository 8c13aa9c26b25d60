//! Appointment API routes
//!
//! Booking is gated by the plan's monthly appointment allowance. The
//! allowance counts bookings made this calendar month, so cancelling an
//! appointment does not hand the slot back.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use clinova_shared::{Appointment, AppointmentStatus, PaginatedResponse, ResourceKind};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Query params for the appointment list
#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Filter by patient
    pub patient_id: Option<Uuid>,
    /// Filter by status
    pub status: Option<String>,
    /// Only appointments at or after this time
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
}

/// Create appointment request
#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub provider_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

/// Update appointment request
#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub duration_minutes: Option<i32>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

const APPOINTMENT_COLUMNS: &str = "id, org_id, patient_id, provider_id, scheduled_at, \
     duration_minutes, status, notes, created_at, updated_at";

/// List appointments for the clinic
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListAppointmentsQuery>,
) -> ApiResult<Json<PaginatedResponse<Appointment>>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);

    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<AppointmentStatus>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown status: {}", raw)))?
                .to_string(),
        ),
        None => None,
    };

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM appointments
        WHERE org_id = $1
          AND ($2::uuid IS NULL OR patient_id = $2)
          AND ($3::text IS NULL OR status = $3)
          AND ($4::timestamptz IS NULL OR scheduled_at >= $4)
        "#,
    )
    .bind(auth_user.org_id)
    .bind(query.patient_id)
    .bind(&status)
    .bind(query.from)
    .fetch_one(&state.pool)
    .await?;

    let appointments: Vec<Appointment> = sqlx::query_as(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE org_id = $1
          AND ($2::uuid IS NULL OR patient_id = $2)
          AND ($3::text IS NULL OR status = $3)
          AND ($4::timestamptz IS NULL OR scheduled_at >= $4)
        ORDER BY scheduled_at ASC
        LIMIT $5 OFFSET $6
        "#
    ))
    .bind(auth_user.org_id)
    .bind(query.patient_id)
    .bind(&status)
    .bind(query.from)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(
        appointments,
        total.0,
        page,
        per_page,
    )))
}

/// Book an appointment. Blocked with 402 when this month's allowance is
/// exhausted.
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    let duration = req.duration_minutes.unwrap_or(30);
    if !(5..=480).contains(&duration) {
        return Err(ApiError::Validation(
            "Duration must be between 5 and 480 minutes".to_string(),
        ));
    }

    // The patient must belong to this clinic.
    let patient_exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1 AND org_id = $2 AND active = true)",
    )
    .bind(req.patient_id)
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;
    if !patient_exists.0 {
        return Err(ApiError::NotFound);
    }

    state
        .plans
        .ensure_can_add(auth_user.org_id, ResourceKind::Appointments)
        .await?;

    let appointment: Appointment = sqlx::query_as(&format!(
        r#"
        INSERT INTO appointments
            (id, org_id, patient_id, provider_id, scheduled_at, duration_minutes, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(auth_user.org_id)
    .bind(req.patient_id)
    .bind(req.provider_id)
    .bind(req.scheduled_at)
    .bind(duration)
    .bind(AppointmentStatus::Scheduled.to_string())
    .bind(req.notes)
    .fetch_one(&state.pool)
    .await?;

    state.plans.invalidate_usage(auth_user.org_id);

    tracing::info!(
        org_id = %auth_user.org_id,
        appointment_id = %appointment.id,
        patient_id = %appointment.patient_id,
        "appointment booked"
    );
    Ok(Json(appointment))
}

/// Get a single appointment
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    let appointment: Appointment = sqlx::query_as(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1 AND org_id = $2"
    ))
    .bind(appointment_id)
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(appointment))
}

/// Reschedule or change the status of an appointment
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    if let Some(duration) = req.duration_minutes {
        if !(5..=480).contains(&duration) {
            return Err(ApiError::Validation(
                "Duration must be between 5 and 480 minutes".to_string(),
            ));
        }
    }

    let status = match &req.status {
        Some(raw) => Some(
            raw.parse::<AppointmentStatus>()
                .map_err(|_| ApiError::Validation(format!("Unknown status: {}", raw)))?
                .to_string(),
        ),
        None => None,
    };

    let appointment: Appointment = sqlx::query_as(&format!(
        r#"
        UPDATE appointments SET
            scheduled_at = COALESCE($3, scheduled_at),
            duration_minutes = COALESCE($4, duration_minutes),
            status = COALESCE($5, status),
            notes = COALESCE($6, notes),
            updated_at = NOW()
        WHERE id = $1 AND org_id = $2
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(auth_user.org_id)
    .bind(req.scheduled_at)
    .bind(req.duration_minutes)
    .bind(status)
    .bind(req.notes)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(appointment))
}

/// Cancel an appointment. The monthly allowance is not refunded.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    let appointment: Appointment = sqlx::query_as(&format!(
        r#"
        UPDATE appointments SET status = $3, updated_at = NOW()
        WHERE id = $1 AND org_id = $2
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(auth_user.org_id)
    .bind(AppointmentStatus::Cancelled.to_string())
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(appointment))
}
