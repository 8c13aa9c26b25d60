//! Common types used across Clinova

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

// =============================================================================
// Plan tiers and the plan catalog
// =============================================================================

/// Subscription plan tier for a clinic (tenant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Professional,
    Enterprise,
}

impl Default for PlanTier {
    fn default() -> Self {
        Self::Basic
    }
}

impl PlanTier {
    /// Look up the immutable limits record for this tier.
    ///
    /// Total function: every tier maps to a fully-populated `PlanLimits` with
    /// non-zero resource caps.
    pub fn limits(&self) -> PlanLimits {
        match self {
            Self::Basic => PlanLimits {
                max_users: 3,
                max_patients: 200,
                max_appointments_per_month: 500,
                can_manage_users: false,
                can_export_data: false,
                can_access_reports: false,
                can_customize_forms: false,
                can_use_api: false,
                can_send_reminders: true,
                can_upload_documents: true,
                can_use_telehealth: false,
                can_view_audit_log: false,
                can_manage_billing: false,
                support_level: SupportLevel::Email,
                backup_level: BackupLevel::Basic,
            },
            Self::Professional => PlanLimits {
                max_users: 15,
                max_patients: 2_000,
                max_appointments_per_month: 5_000,
                can_manage_users: true,
                can_export_data: true,
                can_access_reports: true,
                can_customize_forms: true,
                can_use_api: true,
                can_send_reminders: true,
                can_upload_documents: true,
                can_use_telehealth: true,
                can_view_audit_log: false,
                can_manage_billing: true,
                support_level: SupportLevel::Priority,
                backup_level: BackupLevel::Automatic,
            },
            Self::Enterprise => PlanLimits {
                max_users: 100,
                max_patients: 50_000,
                max_appointments_per_month: 100_000,
                can_manage_users: true,
                can_export_data: true,
                can_access_reports: true,
                can_customize_forms: true,
                can_use_api: true,
                can_send_reminders: true,
                can_upload_documents: true,
                can_use_telehealth: true,
                can_view_audit_log: true,
                can_manage_billing: true,
                support_level: SupportLevel::TwentyFourSeven,
                backup_level: BackupLevel::Enterprise,
            },
        }
    }

    /// The tier a clinic would move to if it outgrows this one.
    /// Enterprise is terminal.
    pub fn next_tier(&self) -> Option<PlanTier> {
        match self {
            Self::Basic => Some(Self::Professional),
            Self::Professional => Some(Self::Enterprise),
            Self::Enterprise => None,
        }
    }

    /// Parse a tier from string, degrading to Basic for anything unknown.
    /// Fail-safe-to-restrictive: an unrecognized tier never grants more access.
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(Self::Basic)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Professional => write!(f, "professional"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "professional" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(format!("Invalid plan tier: {}", s)),
        }
    }
}

/// Support tier included with a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    Email,
    Priority,
    TwentyFourSeven,
}

/// Backup tier included with a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupLevel {
    Basic,
    Automatic,
    Enterprise,
}

/// The capped resources tracked against a plan.
///
/// Closed enum on purpose: a typo'd resource name is a compile error, not a
/// silent `false` from a string-keyed flag lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Users,
    Patients,
    Appointments,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [Self::Users, Self::Patients, Self::Appointments];

    /// Human-readable label used in upgrade recommendations
    pub fn label(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Patients => "patients",
            Self::Appointments => "appointments this month",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Users => write!(f, "users"),
            Self::Patients => write!(f, "patients"),
            Self::Appointments => write!(f, "appointments"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "users" => Ok(Self::Users),
            "patients" => Ok(Self::Patients),
            "appointments" => Ok(Self::Appointments),
            _ => Err(format!("Invalid resource kind: {}", s)),
        }
    }
}

/// Per-tier limits record: resource caps, capability flags, service levels.
///
/// Produced once by the catalog (`PlanTier::limits`) and never mutated at
/// runtime. All resource caps are non-zero by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_users: u32,
    pub max_patients: u32,
    pub max_appointments_per_month: u32,
    pub can_manage_users: bool,
    pub can_export_data: bool,
    pub can_access_reports: bool,
    pub can_customize_forms: bool,
    pub can_use_api: bool,
    pub can_send_reminders: bool,
    pub can_upload_documents: bool,
    pub can_use_telehealth: bool,
    pub can_view_audit_log: bool,
    pub can_manage_billing: bool,
    pub support_level: SupportLevel,
    pub backup_level: BackupLevel,
}

impl PlanLimits {
    /// Cap for a capped resource
    pub fn max(&self, resource: ResourceKind) -> u32 {
        match resource {
            ResourceKind::Users => self.max_users,
            ResourceKind::Patients => self.max_patients,
            ResourceKind::Appointments => self.max_appointments_per_month,
        }
    }
}

// =============================================================================
// Subscription status and tier resolution
// =============================================================================

/// Subscription status, written by the external billing collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Cancelled,
    Expired,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Trial => write!(f, "trial"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "trial" => Ok(Self::Trial),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

/// Resolve the plan tier that applies to an organization right now.
///
/// This is THE place the "no subscription means Basic" rule lives. Absent
/// subscription, an unparseable tier string, and expired or cancelled
/// subscriptions past their paid period all resolve to the most restrictive
/// tier rather than failing.
pub fn resolve_tier(subscription: Option<&Subscription>) -> PlanTier {
    let Some(sub) = subscription else {
        return PlanTier::Basic;
    };

    let status: SubscriptionStatus = sub.status.parse().unwrap_or(SubscriptionStatus::Expired);
    match status {
        SubscriptionStatus::Active | SubscriptionStatus::Trial => {
            PlanTier::from_str_lossy(&sub.plan_tier)
        }
        SubscriptionStatus::Cancelled => {
            // Cancelled keeps its tier until the paid period runs out
            let in_period = sub
                .current_period_end
                .map(|end| end > OffsetDateTime::now_utc())
                .unwrap_or(false);
            if in_period {
                PlanTier::from_str_lossy(&sub.plan_tier)
            } else {
                PlanTier::Basic
            }
        }
        SubscriptionStatus::Expired => PlanTier::Basic,
    }
}

// =============================================================================
// User roles
// =============================================================================

/// User role within a clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Owner,
    Admin,
    Provider,
    Staff,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Staff
    }
}

impl UserRole {
    /// Permission level (higher = more permissions)
    pub fn level(&self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::Provider => 1,
            Self::Staff => 0,
        }
    }

    /// Check if this role can administer the clinic (manage users, plan)
    pub fn can_administer(&self) -> bool {
        self.level() >= 2
    }

    /// Parse a role from string (case insensitive), defaulting to Staff
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            "provider" => Self::Provider,
            _ => Self::Staff,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
            Self::Provider => write!(f, "provider"),
            Self::Staff => write!(f, "staff"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "provider" => Ok(Self::Provider),
            "staff" => Ok(Self::Staff),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::NoShow => write!(f, "no_show"),
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }
}

// =============================================================================
// Database Models
// =============================================================================

/// Organization (clinic / tenant) model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub timezone: String,
    pub settings: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// User (staff member) model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Patient model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub org_id: Uuid,
    pub full_name: String,
    pub date_of_birth: Option<Date>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Appointment model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub org_id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub scheduled_at: OffsetDateTime,
    pub duration_minutes: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Medical record entry for a patient
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub patient_id: Uuid,
    pub author_id: Option<Uuid>,
    pub record_type: String,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// Subscription model. Owned and mutated by the billing collaborator;
/// read-only from this service's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub org_id: Uuid,
    pub plan_tier: String,
    pub status: String,
    pub current_period_start: Option<OffsetDateTime>,
    pub current_period_end: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// API Response Types
// =============================================================================

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        // Guard here, not just at call sites: a zero page size must not panic
        // the page-count division.
        let per_page = per_page.max(1);
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(tier: &str, status: &str, period_end: Option<OffsetDateTime>) -> Subscription {
        let now = OffsetDateTime::now_utc();
        Subscription {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            plan_tier: tier.to_string(),
            status: status.to_string(),
            current_period_start: None,
            current_period_end: period_end,
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // PlanTier / catalog tests
    // =========================================================================

    #[test]
    fn test_plan_tier_default() {
        assert_eq!(PlanTier::default(), PlanTier::Basic);
    }

    #[test]
    fn test_catalog_resource_caps() {
        assert_eq!(PlanTier::Basic.limits().max_users, 3);
        assert_eq!(PlanTier::Basic.limits().max_patients, 200);
        assert_eq!(PlanTier::Basic.limits().max_appointments_per_month, 500);
        assert_eq!(PlanTier::Professional.limits().max_users, 15);
        assert_eq!(PlanTier::Professional.limits().max_patients, 2_000);
        assert_eq!(PlanTier::Enterprise.limits().max_patients, 50_000);
    }

    #[test]
    fn test_catalog_caps_are_nonzero() {
        for tier in [PlanTier::Basic, PlanTier::Professional, PlanTier::Enterprise] {
            let limits = tier.limits();
            for resource in ResourceKind::ALL {
                assert!(limits.max(resource) > 0, "{tier} {resource} cap must be non-zero");
            }
        }
    }

    #[test]
    fn test_catalog_capability_flags() {
        assert!(!PlanTier::Basic.limits().can_manage_users);
        assert!(!PlanTier::Basic.limits().can_export_data);
        assert!(PlanTier::Basic.limits().can_send_reminders);
        assert!(PlanTier::Professional.limits().can_manage_users);
        assert!(!PlanTier::Professional.limits().can_view_audit_log);
        assert!(PlanTier::Enterprise.limits().can_view_audit_log);
        assert!(PlanTier::Enterprise.limits().can_use_telehealth);
    }

    #[test]
    fn test_catalog_service_levels() {
        assert_eq!(PlanTier::Basic.limits().support_level, SupportLevel::Email);
        assert_eq!(
            PlanTier::Professional.limits().backup_level,
            BackupLevel::Automatic
        );
        assert_eq!(
            PlanTier::Enterprise.limits().support_level,
            SupportLevel::TwentyFourSeven
        );
    }

    #[test]
    fn test_next_tier() {
        assert_eq!(PlanTier::Basic.next_tier(), Some(PlanTier::Professional));
        assert_eq!(
            PlanTier::Professional.next_tier(),
            Some(PlanTier::Enterprise)
        );
        assert_eq!(PlanTier::Enterprise.next_tier(), None);
    }

    #[test]
    fn test_plan_tier_display_and_parse() {
        assert_eq!(format!("{}", PlanTier::Professional), "professional");
        assert_eq!(
            "ENTERPRISE".parse::<PlanTier>().unwrap(),
            PlanTier::Enterprise
        );
        assert!("platinum".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_plan_tier_from_str_lossy_degrades_to_basic() {
        assert_eq!(PlanTier::from_str_lossy("professional"), PlanTier::Professional);
        assert_eq!(PlanTier::from_str_lossy("platinum"), PlanTier::Basic);
        assert_eq!(PlanTier::from_str_lossy(""), PlanTier::Basic);
    }

    #[test]
    fn test_plan_limits_max_lookup() {
        let limits = PlanTier::Professional.limits();
        assert_eq!(limits.max(ResourceKind::Users), 15);
        assert_eq!(limits.max(ResourceKind::Patients), 2_000);
        assert_eq!(limits.max(ResourceKind::Appointments), 5_000);
    }

    // =========================================================================
    // ResourceKind tests
    // =========================================================================

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!(
            "patients".parse::<ResourceKind>().unwrap(),
            ResourceKind::Patients
        );
        assert!("invoices".parse::<ResourceKind>().is_err());
    }

    // =========================================================================
    // resolve_tier tests
    // =========================================================================

    #[test]
    fn test_resolve_tier_no_subscription_falls_back_to_basic() {
        assert_eq!(resolve_tier(None), PlanTier::Basic);
    }

    #[test]
    fn test_resolve_tier_active() {
        let sub = subscription("professional", "active", None);
        assert_eq!(resolve_tier(Some(&sub)), PlanTier::Professional);
    }

    #[test]
    fn test_resolve_tier_trial_keeps_tier() {
        let sub = subscription("enterprise", "trial", None);
        assert_eq!(resolve_tier(Some(&sub)), PlanTier::Enterprise);
    }

    #[test]
    fn test_resolve_tier_unknown_tier_degrades_to_basic() {
        let sub = subscription("platinum", "active", None);
        assert_eq!(resolve_tier(Some(&sub)), PlanTier::Basic);
    }

    #[test]
    fn test_resolve_tier_expired_degrades_to_basic() {
        let sub = subscription("enterprise", "expired", None);
        assert_eq!(resolve_tier(Some(&sub)), PlanTier::Basic);
    }

    #[test]
    fn test_resolve_tier_cancelled_in_period_keeps_tier() {
        let end = OffsetDateTime::now_utc() + time::Duration::days(10);
        let sub = subscription("professional", "cancelled", Some(end));
        assert_eq!(resolve_tier(Some(&sub)), PlanTier::Professional);
    }

    #[test]
    fn test_resolve_tier_cancelled_past_period_degrades() {
        let end = OffsetDateTime::now_utc() - time::Duration::days(1);
        let sub = subscription("professional", "cancelled", Some(end));
        assert_eq!(resolve_tier(Some(&sub)), PlanTier::Basic);
    }

    // =========================================================================
    // UserRole tests
    // =========================================================================

    #[test]
    fn test_user_role_levels() {
        assert_eq!(UserRole::Staff.level(), 0);
        assert_eq!(UserRole::Provider.level(), 1);
        assert_eq!(UserRole::Admin.level(), 2);
        assert_eq!(UserRole::Owner.level(), 3);
    }

    #[test]
    fn test_user_role_can_administer() {
        assert!(!UserRole::Staff.can_administer());
        assert!(!UserRole::Provider.can_administer());
        assert!(UserRole::Admin.can_administer());
        assert!(UserRole::Owner.can_administer());
    }

    #[test]
    fn test_user_role_from_str_lossy() {
        assert_eq!(UserRole::from_str_lossy("OWNER"), UserRole::Owner);
        assert_eq!(UserRole::from_str_lossy("unknown"), UserRole::Staff);
    }

    // =========================================================================
    // PaginatedResponse tests
    // =========================================================================

    #[test]
    fn test_paginated_response_partial_page() {
        let response = PaginatedResponse::new(vec![1, 2, 3], 23, 3, 10);
        assert_eq!(response.total_pages, 3);
    }

    #[test]
    fn test_paginated_response_zero_per_page_does_not_panic() {
        let response = PaginatedResponse::new(Vec::<i32>::new(), 5, 1, 0);
        assert_eq!(response.per_page, 1);
        assert_eq!(response.total_pages, 5);
    }
}
