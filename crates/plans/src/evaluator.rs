//! Limit evaluator
//!
//! Pure, synchronous rules over `(PlanLimits, UsageStats)`. Same inputs
//! always produce the same outputs; no hidden state, no I/O.
//!
//! Threshold ladder: the upgrade banner appears at 80%, the specific
//! recommendation text at 90%, and the hard gate at the cap itself.

use clinova_shared::{PlanLimits, PlanTier, ResourceKind};

use crate::usage::UsageStats;

/// Percentage at which a resource counts as approaching its limit
pub const APPROACHING_THRESHOLD: u32 = 80;

/// Percentage at which an upgrade is recommended by name
pub const RECOMMEND_THRESHOLD: u32 = 90;

/// Evaluates a usage snapshot against the limits of one tier
pub struct LimitEvaluator<'a> {
    tier: PlanTier,
    limits: PlanLimits,
    usage: &'a UsageStats,
}

impl<'a> LimitEvaluator<'a> {
    pub fn new(tier: PlanTier, usage: &'a UsageStats) -> Self {
        Self {
            tier,
            limits: tier.limits(),
            usage,
        }
    }

    pub fn limits(&self) -> &PlanLimits {
        &self.limits
    }

    /// Usage percentage for a resource, round-half-up.
    ///
    /// Clamped to 99 while the count is still strictly under the cap, so a
    /// 99.6% reading cannot round up into `is_at_limit` while `can_add` is
    /// still true. The three gates never disagree.
    pub fn usage_percentage(&self, resource: ResourceKind) -> u32 {
        let current = u64::from(self.usage.current(resource));
        let max = u64::from(self.limits.max(resource)); // non-zero by catalog construction

        let rounded = ((200 * current + max) / (2 * max)) as u32;
        if current < max {
            rounded.min(99)
        } else {
            rounded
        }
    }

    /// Strict less-than: reaching the cap blocks further addition
    pub fn can_add(&self, resource: ResourceKind) -> bool {
        self.usage.current(resource) < self.limits.max(resource)
    }

    /// How many more of this resource the plan allows
    pub fn remaining_capacity(&self, resource: ResourceKind) -> u32 {
        self.limits
            .max(resource)
            .saturating_sub(self.usage.current(resource))
    }

    pub fn is_approaching_limit(&self, resource: ResourceKind) -> bool {
        self.usage_percentage(resource) >= APPROACHING_THRESHOLD
    }

    pub fn is_at_limit(&self, resource: ResourceKind) -> bool {
        self.usage_percentage(resource) >= 100
    }

    /// True when any resource is at or past the approaching threshold.
    /// Deliberately a lower bar than the recommendation text: the banner
    /// appears before the specific recommendation does.
    pub fn should_show_upgrade_prompt(&self) -> bool {
        ResourceKind::ALL
            .iter()
            .any(|&resource| self.is_approaching_limit(resource))
    }

    /// Recommendation naming every resource at or past 90% and the next
    /// tier up. Enterprise is terminal and never recommends further.
    pub fn upgrade_recommendation(&self) -> Option<String> {
        let next = self.tier.next_tier()?;

        let strained: Vec<&str> = ResourceKind::ALL
            .iter()
            .filter(|&&resource| self.usage_percentage(resource) >= RECOMMEND_THRESHOLD)
            .map(|resource| resource.label())
            .collect();

        if strained.is_empty() {
            return None;
        }

        Some(format!(
            "Your clinic is using over {}% of its capacity for {}. Consider upgrading to the {} plan.",
            RECOMMEND_THRESHOLD,
            strained.join(", "),
            next
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn usage(users: u32, patients: u32, appointments: u32) -> UsageStats {
        UsageStats {
            org_id: Uuid::new_v4(),
            current_users: users,
            current_patients: patients,
            current_appointments_this_month: appointments,
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_remaining_capacity_formula() {
        // Basic caps: 3 users, 200 patients, 500 appointments
        let stats = usage(2, 150, 600);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        assert_eq!(eval.remaining_capacity(ResourceKind::Users), 1);
        assert_eq!(eval.remaining_capacity(ResourceKind::Patients), 50);
        // Over the cap saturates to zero, never goes negative
        assert_eq!(eval.remaining_capacity(ResourceKind::Appointments), 0);
    }

    #[test]
    fn test_at_limit_and_can_add_never_disagree() {
        for patients in [0, 100, 159, 160, 199, 200, 201, 250] {
            let stats = usage(0, patients, 0);
            let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

            if eval.is_at_limit(ResourceKind::Patients) {
                assert!(
                    !eval.can_add(ResourceKind::Patients),
                    "can_add must be false at {} patients",
                    patients
                );
            }
            // at-limit tracks the rounded percentage reaching 100
            assert_eq!(
                eval.is_at_limit(ResourceKind::Patients),
                eval.usage_percentage(ResourceKind::Patients) >= 100
            );
        }
    }

    #[test]
    fn test_evaluator_is_pure() {
        let stats = usage(2, 150, 100);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        let first = (
            eval.usage_percentage(ResourceKind::Patients),
            eval.can_add(ResourceKind::Patients),
            eval.upgrade_recommendation(),
        );
        let second = (
            eval.usage_percentage(ResourceKind::Patients),
            eval.can_add(ResourceKind::Patients),
            eval.upgrade_recommendation(),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_boundary_usage_equal_to_cap() {
        let stats = usage(3, 200, 500);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        for resource in ResourceKind::ALL {
            assert!(!eval.can_add(resource));
            assert_eq!(eval.usage_percentage(resource), 100);
            assert!(eval.is_at_limit(resource));
            assert_eq!(eval.remaining_capacity(resource), 0);
        }
    }

    #[test]
    fn test_boundary_79_vs_80_flips_approaching_only() {
        // Basic maxPatients=200: 158 -> 79%, 160 -> 80%
        let below = usage(0, 158, 0);
        let at = usage(0, 160, 0);
        let eval_below = LimitEvaluator::new(PlanTier::Basic, &below);
        let eval_at = LimitEvaluator::new(PlanTier::Basic, &at);

        assert_eq!(eval_below.usage_percentage(ResourceKind::Patients), 79);
        assert!(!eval_below.is_approaching_limit(ResourceKind::Patients));
        assert_eq!(eval_at.usage_percentage(ResourceKind::Patients), 80);
        assert!(eval_at.is_approaching_limit(ResourceKind::Patients));

        // No other gate moves across that boundary
        for eval in [&eval_below, &eval_at] {
            assert!(eval.can_add(ResourceKind::Patients));
            assert!(!eval.is_at_limit(ResourceKind::Patients));
            assert!(eval.upgrade_recommendation().is_none());
        }
    }

    #[test]
    fn test_rounding_edge_just_under_cap() {
        // 498/500 is 99.6%: round-half-up alone would report 100 while the
        // count is still under the cap. The percentage is clamped to 99 so
        // the gates stay consistent.
        let stats = usage(0, 0, 498);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        assert_eq!(eval.usage_percentage(ResourceKind::Appointments), 99);
        assert!(!eval.is_at_limit(ResourceKind::Appointments));
        assert!(eval.can_add(ResourceKind::Appointments));
    }

    #[test]
    fn test_rounding_half_up() {
        // 161/200 = 80.5% rounds up to 81
        let stats = usage(0, 161, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);
        assert_eq!(eval.usage_percentage(ResourceKind::Patients), 81);
    }

    #[test]
    fn test_percentage_can_exceed_100() {
        let stats = usage(0, 250, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);
        assert_eq!(eval.usage_percentage(ResourceKind::Patients), 125);
        assert!(eval.is_at_limit(ResourceKind::Patients));
    }

    #[test]
    fn test_scenario_basic_160_of_200_patients() {
        let stats = usage(0, 160, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        assert_eq!(eval.usage_percentage(ResourceKind::Patients), 80);
        assert!(eval.is_approaching_limit(ResourceKind::Patients));
        assert!(eval.should_show_upgrade_prompt());
        // 80% shows the banner but not yet the named recommendation
        assert!(eval.upgrade_recommendation().is_none());
    }

    #[test]
    fn test_scenario_professional_users_full() {
        // Professional maxUsers=15, all seats taken
        let stats = usage(15, 0, 0);
        let eval = LimitEvaluator::new(PlanTier::Professional, &stats);

        assert!(!eval.can_add(ResourceKind::Users));
        assert_eq!(eval.remaining_capacity(ResourceKind::Users), 0);
    }

    #[test]
    fn test_scenario_enterprise_never_recommends_upgrade() {
        // Enterprise caps: 100 users, 50_000 patients, 100_000 appointments;
        // everything at 95%
        let stats = usage(95, 47_500, 95_000);
        let eval = LimitEvaluator::new(PlanTier::Enterprise, &stats);

        for resource in ResourceKind::ALL {
            assert_eq!(eval.usage_percentage(resource), 95);
        }
        assert!(eval.should_show_upgrade_prompt());
        assert!(eval.upgrade_recommendation().is_none());
    }

    #[test]
    fn test_recommendation_names_all_strained_resources() {
        // Basic: users 3/3 = 100%, patients 190/200 = 95%, appointments low
        let stats = usage(3, 190, 10);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        let message = eval.upgrade_recommendation().unwrap();
        assert!(message.contains("users"));
        assert!(message.contains("patients"));
        assert!(!message.contains("appointments"));
        assert!(message.contains("professional"));
    }

    #[test]
    fn test_recommendation_targets_next_tier() {
        let stats = usage(14, 0, 0); // 14/15 = 93%
        let eval = LimitEvaluator::new(PlanTier::Professional, &stats);

        let message = eval.upgrade_recommendation().unwrap();
        assert!(message.contains("enterprise"));
    }

    #[test]
    fn test_prompt_threshold_lower_than_recommendation() {
        // 85%: banner yes, named recommendation not yet
        let stats = usage(0, 170, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        assert!(eval.should_show_upgrade_prompt());
        assert!(eval.upgrade_recommendation().is_none());

        // 90%: both
        let stats = usage(0, 180, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);
        assert!(eval.should_show_upgrade_prompt());
        assert!(eval.upgrade_recommendation().is_some());
    }

    #[test]
    fn test_resources_evaluated_independently() {
        // Patients at the cap must not affect the users gates
        let stats = usage(1, 200, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        assert!(eval.is_at_limit(ResourceKind::Patients));
        assert!(!eval.is_at_limit(ResourceKind::Users));
        assert!(eval.can_add(ResourceKind::Users));
        assert_eq!(eval.remaining_capacity(ResourceKind::Users), 2);
    }

    #[test]
    fn test_zero_usage() {
        let stats = usage(0, 0, 0);
        let eval = LimitEvaluator::new(PlanTier::Basic, &stats);

        for resource in ResourceKind::ALL {
            assert_eq!(eval.usage_percentage(resource), 0);
            assert!(eval.can_add(resource));
            assert!(!eval.is_approaching_limit(resource));
        }
        assert!(!eval.should_show_upgrade_prompt());
        assert!(eval.upgrade_recommendation().is_none());
    }
}
