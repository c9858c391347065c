use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use super::principal::UserKind;

/// -1 on a quota field means unlimited; it is never decremented.
pub const UNLIMITED: i64 = -1;

/// Display-only name/value pair shown on pricing pages.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct PlanFeature {
    pub name: String,
    pub value: String,
}

/// Subscription tier. `jobs_quota` is jobs-can-apply for employee plans
/// and jobs-can-post for employer plans; `contact_views_quota` covers the
/// opposite kind's contact details.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Plan {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub plan_for: UserKind,
    pub name: String,
    pub price: f64,
    /// <= 0 means the plan never expires.
    pub validity_days: i64,
    pub jobs_quota: i64,
    pub contact_views_quota: i64,
    pub job_alerts: bool,
    pub free_contact_views: bool,
    pub is_default: bool,
    pub features: Vec<PlanFeature>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Plan {
    pub fn never_expires(&self) -> bool {
        self.validity_days <= 0
    }
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreatePlanDto {
    /// "employee" or "employer"
    pub plan_for: String,
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    pub validity_days: i64,
    pub jobs_quota: i64,
    pub contact_views_quota: i64,
    pub job_alerts: Option<bool>,
    pub free_contact_views: Option<bool>,
    pub is_default: Option<bool>,
    pub features: Option<Vec<PlanFeature>>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdatePlanDto {
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: Option<f64>,
    pub validity_days: Option<i64>,
    pub jobs_quota: Option<i64>,
    pub contact_views_quota: Option<i64>,
    pub job_alerts: Option<bool>,
    pub free_contact_views: Option<bool>,
    pub is_default: Option<bool>,
    pub features: Option<Vec<PlanFeature>>,
}
