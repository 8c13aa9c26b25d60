//! Clinova plan-limits subsystem
//!
//! Answers the question: "what can this clinic do on its current plan, and
//! how close is it to outgrowing it?" Combines the static plan catalog
//! (`clinova_shared::PlanTier::limits`) with live usage counts into
//! percentages, gates, and upgrade recommendations.

pub mod error;
pub mod evaluator;
pub mod subscription;
pub mod usage;

pub use error::{PlanError, PlanResult};
pub use evaluator::LimitEvaluator;
pub use subscription::SubscriptionStore;
pub use usage::{UsageReader, UsageService, UsageStats, UsageView};

use clinova_shared::{PlanLimits, PlanTier, ResourceKind, Subscription};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Facade over subscription resolution, usage reads, and limit evaluation.
///
/// This is the one entry point the API layer talks to.
#[derive(Clone)]
pub struct PlanService {
    subscriptions: SubscriptionStore,
    usage: UsageService,
}

/// Everything the plan dashboard needs in one response
#[derive(Debug, Clone, Serialize)]
pub struct PlanOverview {
    pub tier: PlanTier,
    pub limits: PlanLimits,
    pub usage: UsageStats,
    /// Percentages per resource, same order as `ResourceKind::ALL`
    pub percentages: Vec<ResourceUsage>,
    pub show_upgrade_prompt: bool,
    pub upgrade_recommendation: Option<String>,
    /// True when the usage snapshot is a retained previous read served after
    /// a fetch failure
    pub stale: bool,
    pub error: Option<String>,
}

/// One resource's position against its cap
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    pub resource: ResourceKind,
    pub current: u32,
    pub max: u32,
    pub percentage: u32,
    pub remaining: u32,
    pub at_limit: bool,
    pub approaching_limit: bool,
}

impl PlanService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            subscriptions: SubscriptionStore::new(pool.clone()),
            usage: UsageService::new(pool),
        }
    }

    /// Resolve the tier that applies to the organization right now
    pub async fn tier(&self, org_id: Uuid) -> PlanResult<PlanTier> {
        self.subscriptions.tier_for_org(org_id).await
    }

    /// Catalog limits for the organization's current tier
    pub async fn limits(&self, org_id: Uuid) -> PlanResult<PlanLimits> {
        Ok(self.tier(org_id).await?.limits())
    }

    /// The organization's subscription record, if any
    pub async fn subscription(&self, org_id: Uuid) -> PlanResult<Option<Subscription>> {
        self.subscriptions.for_org(org_id).await
    }

    /// Usage snapshot, served from cache within the TTL window
    pub async fn usage(&self, org_id: Uuid, refresh: bool) -> PlanResult<UsageView> {
        self.usage.get(org_id, refresh).await
    }

    /// Full dashboard view: tier, limits, usage, per-resource percentages,
    /// and the upgrade recommendation
    pub async fn overview(&self, org_id: Uuid, refresh: bool) -> PlanResult<PlanOverview> {
        let tier = self.tier(org_id).await?;
        let view = self.usage.get(org_id, refresh).await?;
        let evaluator = LimitEvaluator::new(tier, &view.stats);

        let percentages = ResourceKind::ALL
            .iter()
            .map(|&resource| ResourceUsage {
                resource,
                current: view.stats.current(resource),
                max: evaluator.limits().max(resource),
                percentage: evaluator.usage_percentage(resource),
                remaining: evaluator.remaining_capacity(resource),
                at_limit: evaluator.is_at_limit(resource),
                approaching_limit: evaluator.is_approaching_limit(resource),
            })
            .collect();

        Ok(PlanOverview {
            tier,
            limits: tier.limits(),
            show_upgrade_prompt: evaluator.should_show_upgrade_prompt(),
            upgrade_recommendation: evaluator.upgrade_recommendation(),
            percentages,
            usage: view.stats,
            stale: view.stale,
            error: view.error,
        })
    }

    /// Enforcement gate for create paths. Reads live counts (never the
    /// cached snapshot) so a full clinic cannot slip past the cap through a
    /// stale read.
    pub async fn ensure_can_add(&self, org_id: Uuid, resource: ResourceKind) -> PlanResult<()> {
        let tier = self.tier(org_id).await?;
        let stats = self.usage.fetch_live(org_id).await?;
        let evaluator = LimitEvaluator::new(tier, &stats);

        if evaluator.can_add(resource) {
            Ok(())
        } else {
            Err(PlanError::QuotaExceeded {
                resource,
                max: evaluator.limits().max(resource),
            })
        }
    }

    /// Drop the cached usage snapshot for an organization. Called after
    /// mutations that change the counts.
    pub fn invalidate_usage(&self, org_id: Uuid) {
        self.usage.invalidate(org_id);
    }

    /// Sweep expired cache entries; wired to a periodic task in the binary
    pub fn sweep_caches(&self) {
        self.usage.sweep();
    }
}
