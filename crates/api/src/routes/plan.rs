//! Plan-limits API routes
//!
//! Read-only views over the plan subsystem: current limits, cached usage
//! with percentages, per-resource gates, and the upgrade recommendation.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use clinova_shared::{PlanLimits, PlanTier, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

/// Current plan and its catalog limits
#[derive(Debug, Serialize)]
pub struct PlanLimitsResponse {
    pub tier: PlanTier,
    pub limits: PlanLimits,
}

/// Query params for the usage endpoint
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Bypass the cache and recount
    pub refresh: Option<bool>,
}

/// Per-resource gate check
#[derive(Debug, Serialize)]
pub struct ResourceCheckResponse {
    pub resource: ResourceKind,
    pub can_add: bool,
    pub remaining: u32,
    pub at_limit: bool,
}

/// Upgrade prompt state
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub tier: PlanTier,
    pub show_upgrade_prompt: bool,
    pub recommendation: Option<String>,
}

/// Get the catalog limits for the clinic's current tier
pub async fn get_plan_limits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<PlanLimitsResponse>> {
    let tier = state.plans.tier(auth_user.org_id).await?;

    Ok(Json(PlanLimitsResponse {
        tier,
        limits: tier.limits(),
    }))
}

/// Get the full usage overview: counts, percentages, gates, recommendation.
/// Served from cache within the TTL window; `?refresh=true` recounts.
pub async fn get_plan_usage(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<Json<clinova_plans::PlanOverview>> {
    let refresh = query.refresh.unwrap_or(false);
    let overview = state.plans.overview(auth_user.org_id, refresh).await?;

    if overview.stale {
        tracing::warn!(
            org_id = %auth_user.org_id,
            "serving stale usage snapshot after fetch failure"
        );
    }

    Ok(Json(overview))
}

/// Check whether one more of a resource can be added right now.
/// Always reads live counts.
pub async fn check_resource(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(resource): Path<String>,
) -> ApiResult<Json<ResourceCheckResponse>> {
    let resource: ResourceKind = resource
        .parse()
        .map_err(crate::error::ApiError::BadRequest)?;

    let overview = state.plans.overview(auth_user.org_id, true).await?;
    let entry = overview
        .percentages
        .iter()
        .find(|r| r.resource == resource)
        .ok_or(crate::error::ApiError::Internal)?;

    Ok(Json(ResourceCheckResponse {
        resource,
        can_add: entry.current < entry.max,
        remaining: entry.remaining,
        at_limit: entry.at_limit,
    }))
}

/// Get the upgrade prompt state for the clinic
pub async fn get_recommendation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<RecommendationResponse>> {
    let overview = state.plans.overview(auth_user.org_id, false).await?;

    Ok(Json(RecommendationResponse {
        tier: overview.tier,
        show_upgrade_prompt: overview.show_upgrade_prompt,
        recommendation: overview.upgrade_recommendation,
    }))
}
