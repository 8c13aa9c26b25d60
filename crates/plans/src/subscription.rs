//! Subscription lookup and tier resolution
//!
//! Subscriptions are written by the external billing collaborator; this
//! module only reads them. Tier fallback lives in one place
//! (`clinova_shared::resolve_tier`) so the "no subscription means Basic"
//! rule cannot drift between call sites.

use clinova_shared::{resolve_tier, PlanTier, Subscription};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::PlanResult;

#[derive(Clone)]
pub struct SubscriptionStore {
    pool: PgPool,
}

impl SubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recent subscription row for an organization, if any
    pub async fn for_org(&self, org_id: Uuid) -> PlanResult<Option<Subscription>> {
        let sub: Option<Subscription> = sqlx::query_as(
            r#"
            SELECT id, org_id, plan_tier, status,
                   current_period_start, current_period_end,
                   created_at, updated_at
            FROM subscriptions
            WHERE org_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    /// Tier that applies right now, Basic when nothing (valid) is on file
    pub async fn tier_for_org(&self, org_id: Uuid) -> PlanResult<PlanTier> {
        let sub = self.for_org(org_id).await?;
        let tier = resolve_tier(sub.as_ref());

        tracing::debug!(org_id = %org_id, tier = %tier, "resolved plan tier");
        Ok(tier)
    }
}
