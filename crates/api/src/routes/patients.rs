//! Patient API routes
//!
//! Create is gated by the plan's patient cap; deletion is a soft
//! deactivate so history stays intact.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use clinova_shared::{PaginatedResponse, Patient, ResourceKind};
use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Query params for the patient list
#[derive(Debug, Deserialize)]
pub struct ListPatientsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Include deactivated patients
    pub include_inactive: Option<bool>,
    /// Case-insensitive name search
    pub search: Option<String>,
}

/// Create patient request
#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub date_of_birth: Option<Date>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Update patient request
#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// List patients for the clinic
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListPatientsQuery>,
) -> ApiResult<Json<PaginatedResponse<Patient>>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);
    let include_inactive = query.include_inactive.unwrap_or(false);
    let search = query
        .search
        .map(|s| format!("%{}%", s.trim()))
        .unwrap_or_else(|| "%".to_string());

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM patients
        WHERE org_id = $1
          AND (active = true OR $2)
          AND full_name ILIKE $3
        "#,
    )
    .bind(auth_user.org_id)
    .bind(include_inactive)
    .bind(&search)
    .fetch_one(&state.pool)
    .await?;

    let patients: Vec<Patient> = sqlx::query_as(
        r#"
        SELECT id, org_id, full_name, date_of_birth, email, phone, active, created_at, updated_at
        FROM patients
        WHERE org_id = $1
          AND (active = true OR $2)
          AND full_name ILIKE $3
        ORDER BY full_name ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(auth_user.org_id)
    .bind(include_inactive)
    .bind(&search)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(patients, total.0, page, per_page)))
}

/// Register a new patient. Blocked with 402 when the plan's patient cap is
/// reached.
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreatePatientRequest>,
) -> ApiResult<Json<Patient>> {
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::Validation("Patient name is required".to_string()));
    }

    state
        .plans
        .ensure_can_add(auth_user.org_id, ResourceKind::Patients)
        .await?;

    let patient: Patient = sqlx::query_as(
        r#"
        INSERT INTO patients (id, org_id, full_name, date_of_birth, email, phone, active)
        VALUES ($1, $2, $3, $4, $5, $6, true)
        RETURNING id, org_id, full_name, date_of_birth, email, phone, active, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.org_id)
    .bind(full_name)
    .bind(req.date_of_birth)
    .bind(req.email)
    .bind(req.phone)
    .fetch_one(&state.pool)
    .await?;

    state.plans.invalidate_usage(auth_user.org_id);

    tracing::info!(org_id = %auth_user.org_id, patient_id = %patient.id, "patient created");
    Ok(Json(patient))
}

/// Get a single patient
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Patient>> {
    let patient: Patient = sqlx::query_as(
        r#"
        SELECT id, org_id, full_name, date_of_birth, email, phone, active, created_at, updated_at
        FROM patients
        WHERE id = $1 AND org_id = $2
        "#,
    )
    .bind(patient_id)
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(patient))
}

/// Update patient details
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<UpdatePatientRequest>,
) -> ApiResult<Json<Patient>> {
    let patient: Patient = sqlx::query_as(
        r#"
        UPDATE patients SET
            full_name = COALESCE($3, full_name),
            date_of_birth = COALESCE($4, date_of_birth),
            email = COALESCE($5, email),
            phone = COALESCE($6, phone),
            updated_at = NOW()
        WHERE id = $1 AND org_id = $2
        RETURNING id, org_id, full_name, date_of_birth, email, phone, active, created_at, updated_at
        "#,
    )
    .bind(patient_id)
    .bind(auth_user.org_id)
    .bind(req.full_name)
    .bind(req.date_of_birth)
    .bind(req.email)
    .bind(req.phone)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(patient))
}

/// Deactivate a patient. Frees a slot against the patient cap.
pub async fn deactivate_patient(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Patient>> {
    let patient: Patient = sqlx::query_as(
        r#"
        UPDATE patients SET active = false, updated_at = NOW()
        WHERE id = $1 AND org_id = $2
        RETURNING id, org_id, full_name, date_of_birth, email, phone, active, created_at, updated_at
        "#,
    )
    .bind(patient_id)
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    state.plans.invalidate_usage(auth_user.org_id);

    Ok(Json(patient))
}

/// Export all active patients. Gated on the plan's export capability.
pub async fn export_patients(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Patient>>> {
    let limits = state.plans.limits(auth_user.org_id).await?;
    if !limits.can_export_data {
        return Err(ApiError::FeatureNotInPlan);
    }

    let patients: Vec<Patient> = sqlx::query_as(
        r#"
        SELECT id, org_id, full_name, date_of_birth, email, phone, active, created_at, updated_at
        FROM patients
        WHERE org_id = $1 AND active = true
        ORDER BY full_name ASC
        "#,
    )
    .bind(auth_user.org_id)
    .fetch_all(&state.pool)
    .await?;

    tracing::info!(
        org_id = %auth_user.org_id,
        count = patients.len(),
        "patient export"
    );
    Ok(Json(patients))
}
