use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use super::plan::{Plan, UNLIMITED};
use super::principal::{UserKind, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

/// Per-owner plan state. Quota counters are seeded from the plan when
/// the subscription is created and decremented as the owner applies to
/// or posts jobs and views contact details. -1 stays -1 (unlimited).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Subscription {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub owner_kind: UserKind,
    pub plan_id: ObjectId,
    /// None for free/default plan grants.
    pub payment_id: Option<ObjectId>,
    pub started_at: DateTime,
    /// None = never expires.
    pub expires_at: Option<DateTime>,
    pub status: SubscriptionStatus,
    pub is_default: bool,
    pub jobs_remaining: i64,
    pub contact_views_remaining: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Subscription {
    pub fn from_plan(owner: &UserRef, plan: &Plan, payment_id: Option<ObjectId>, now: DateTime) -> Self {
        Subscription {
            id: None,
            owner_id: owner.id,
            owner_kind: owner.kind,
            plan_id: plan.id.unwrap_or_else(ObjectId::new),
            payment_id,
            started_at: now,
            expires_at: expiry_from(plan.validity_days, now),
            status: SubscriptionStatus::Active,
            is_default: plan.is_default,
            jobs_remaining: plan.jobs_quota,
            contact_views_remaining: plan.contact_views_quota,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime) -> bool {
        self.expires_at.map(|e| e < now).unwrap_or(false)
    }
}

/// now + validity_days; None for plans that never expire.
pub fn expiry_from(validity_days: i64, now: DateTime) -> Option<DateTime> {
    if validity_days <= 0 {
        return None;
    }
    Some(DateTime::from_millis(
        now.timestamp_millis() + validity_days * 24 * 60 * 60 * 1000,
    ))
}

/// Quota counter after one consuming action. Unlimited never drains.
pub fn consumed(quota: i64) -> i64 {
    if quota == UNLIMITED { UNLIMITED } else { quota - 1 }
}

/// The names the consume endpoint and the atomic update both key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Jobs,
    ContactViews,
}

impl QuotaKind {
    pub fn field(&self) -> &'static str {
        match self {
            QuotaKind::Jobs => "jobs_remaining",
            QuotaKind::ContactViews => "contact_views_remaining",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jobs" => Some(QuotaKind::Jobs),
            "contact-views" => Some(QuotaKind::ContactViews),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::PlanFeature;

    fn plan(validity_days: i64, jobs: i64, views: i64) -> Plan {
        let now = DateTime::now();
        Plan {
            id: Some(ObjectId::new()),
            plan_for: UserKind::Employee,
            name: "Silver".to_string(),
            price: 100.0,
            validity_days,
            jobs_quota: jobs,
            contact_views_quota: views,
            job_alerts: true,
            free_contact_views: false,
            is_default: false,
            features: Vec::<PlanFeature>::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn quotas_are_seeded_from_the_plan() {
        let owner = UserRef { id: ObjectId::new(), kind: UserKind::Employee };
        let now = DateTime::now();
        let sub = Subscription::from_plan(&owner, &plan(30, 10, UNLIMITED), None, now);
        assert_eq!(sub.jobs_remaining, 10);
        assert_eq!(sub.contact_views_remaining, UNLIMITED);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.expires_at.is_some());
    }

    #[test]
    fn non_positive_validity_means_no_expiry() {
        let now = DateTime::now();
        assert!(expiry_from(0, now).is_none());
        assert!(expiry_from(-1, now).is_none());
        let expiry = expiry_from(30, now).unwrap();
        assert_eq!(expiry.timestamp_millis() - now.timestamp_millis(), 30 * 86_400_000);
    }

    #[test]
    fn unlimited_quota_never_decrements() {
        assert_eq!(consumed(UNLIMITED), UNLIMITED);
        assert_eq!(consumed(5), 4);
        assert_eq!(consumed(1), 0);
    }

    #[test]
    fn expiry_in_the_past_marks_the_subscription_expired() {
        let owner = UserRef { id: ObjectId::new(), kind: UserKind::Employee };
        let now = DateTime::now();
        let mut sub = Subscription::from_plan(&owner, &plan(30, 10, 10), None, now);
        sub.expires_at = Some(DateTime::from_millis(now.timestamp_millis() - 1000));
        assert!(sub.is_expired(now));
        sub.expires_at = None;
        assert!(!sub.is_expired(now));
    }
}
