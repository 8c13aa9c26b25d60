//! Medical record API routes
//!
//! Records hang off a patient and are append-only; corrections are new
//! records, not edits.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use clinova_shared::{MedicalRecord, PaginatedResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Query params for the record list
#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Filter by record type (e.g. "note", "lab_result", "prescription")
    pub record_type: Option<String>,
}

/// Create record request
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub record_type: String,
    pub title: String,
    pub body: String,
}

async fn ensure_patient(state: &AppState, org_id: Uuid, patient_id: Uuid) -> ApiResult<()> {
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1 AND org_id = $2)")
            .bind(patient_id)
            .bind(org_id)
            .fetch_one(&state.pool)
            .await?;
    if exists.0 {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

/// List a patient's medical records, newest first
pub async fn list_records(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<ListRecordsQuery>,
) -> ApiResult<Json<PaginatedResponse<MedicalRecord>>> {
    ensure_patient(&state, auth_user.org_id, patient_id).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM medical_records
        WHERE org_id = $1 AND patient_id = $2
          AND ($3::text IS NULL OR record_type = $3)
        "#,
    )
    .bind(auth_user.org_id)
    .bind(patient_id)
    .bind(&query.record_type)
    .fetch_one(&state.pool)
    .await?;

    let records: Vec<MedicalRecord> = sqlx::query_as(
        r#"
        SELECT id, org_id, patient_id, author_id, record_type, title, body, created_at
        FROM medical_records
        WHERE org_id = $1 AND patient_id = $2
          AND ($3::text IS NULL OR record_type = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(auth_user.org_id)
    .bind(patient_id)
    .bind(&query.record_type)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(records, total.0, page, per_page)))
}

/// Add a medical record to a patient's chart
pub async fn create_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<CreateRecordRequest>,
) -> ApiResult<Json<MedicalRecord>> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Record title is required".to_string()));
    }
    let record_type = req.record_type.trim();
    if record_type.is_empty() {
        return Err(ApiError::Validation("Record type is required".to_string()));
    }

    ensure_patient(&state, auth_user.org_id, patient_id).await?;

    let record: MedicalRecord = sqlx::query_as(
        r#"
        INSERT INTO medical_records (id, org_id, patient_id, author_id, record_type, title, body)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, org_id, patient_id, author_id, record_type, title, body, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.org_id)
    .bind(patient_id)
    .bind(auth_user.user_id)
    .bind(record_type)
    .bind(title)
    .bind(&req.body)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        org_id = %auth_user.org_id,
        patient_id = %patient_id,
        record_id = %record.id,
        record_type = %record.record_type,
        "medical record created"
    );
    Ok(Json(record))
}

/// Get a single medical record
pub async fn get_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((patient_id, record_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MedicalRecord>> {
    let record: MedicalRecord = sqlx::query_as(
        r#"
        SELECT id, org_id, patient_id, author_id, record_type, title, body, created_at
        FROM medical_records
        WHERE id = $1 AND patient_id = $2 AND org_id = $3
        "#,
    )
    .bind(record_id)
    .bind(patient_id)
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(record))
}
