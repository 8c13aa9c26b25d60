//! Organization API routes
//!
//! A clinic's own profile, headline stats, and a read-only view of its
//! subscription. Plan changes happen in the billing provider, not here.

use axum::{
    extract::{Extension, State},
    Json,
};
use clinova_shared::{Organization, PlanTier, UserRole};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Update organization request
#[derive(Debug, Deserialize)]
pub struct UpdateOrgRequest {
    pub name: Option<String>,
    pub timezone: Option<String>,
    pub settings: Option<serde_json::Value>,
}

/// Headline counts for the clinic dashboard
#[derive(Debug, Serialize)]
pub struct OrgStatsResponse {
    pub active_users: i64,
    pub active_patients: i64,
    pub upcoming_appointments: i64,
    pub appointments_this_month: i64,
}

/// Read-only subscription view
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub tier: PlanTier,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub current_period_start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub current_period_end: Option<OffsetDateTime>,
}

/// Get the authenticated clinic's profile
pub async fn get_organization(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Organization>> {
    let org: Organization = sqlx::query_as(
        r#"
        SELECT id, name, slug, timezone, settings, created_at, updated_at
        FROM organizations
        WHERE id = $1
        "#,
    )
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(org))
}

/// Update the clinic's profile. Requires an administrative role.
pub async fn update_organization(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<UpdateOrgRequest>,
) -> ApiResult<Json<Organization>> {
    if !UserRole::from_str_lossy(&auth_user.role).can_administer() {
        return Err(ApiError::Forbidden);
    }

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Clinic name cannot be empty".to_string()));
        }
    }

    let org: Organization = sqlx::query_as(
        r#"
        UPDATE organizations SET
            name = COALESCE($2, name),
            timezone = COALESCE($3, timezone),
            settings = COALESCE($4, settings),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, slug, timezone, settings, created_at, updated_at
        "#,
    )
    .bind(auth_user.org_id)
    .bind(req.name.map(|n| n.trim().to_string()))
    .bind(req.timezone)
    .bind(req.settings)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(org))
}

/// Headline counts for the clinic dashboard
pub async fn get_organization_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<OrgStatsResponse>> {
    let active_users: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE org_id = $1 AND active = true")
            .bind(auth_user.org_id)
            .fetch_one(&state.pool)
            .await?;

    let active_patients: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM patients WHERE org_id = $1 AND active = true")
            .bind(auth_user.org_id)
            .fetch_one(&state.pool)
            .await?;

    let upcoming: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM appointments
        WHERE org_id = $1 AND status = 'scheduled' AND scheduled_at >= NOW()
        "#,
    )
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    let this_month: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM appointments
        WHERE org_id = $1 AND created_at >= date_trunc('month', NOW())
        "#,
    )
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(OrgStatsResponse {
        active_users: active_users.0,
        active_patients: active_patients.0,
        upcoming_appointments: upcoming.0,
        appointments_this_month: this_month.0,
    }))
}

/// Read-only view of the clinic's subscription. Clinics with no
/// subscription record are reported on the basic tier.
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = state.plans.subscription(auth_user.org_id).await?;
    let tier = state.plans.tier(auth_user.org_id).await?;

    let response = match subscription {
        Some(sub) => SubscriptionResponse {
            tier,
            status: sub.status,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
        },
        None => SubscriptionResponse {
            tier,
            status: "none".to_string(),
            current_period_start: None,
            current_period_end: None,
        },
    };

    Ok(Json(response))
}
