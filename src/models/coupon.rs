use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use super::principal::UserKind;

/// One-way lifecycle: a coupon leaves `pending` exactly once, into
/// `approved` or `rejected`, and never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    Pending,
    Approved,
    Rejected,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Pending => "pending",
            CouponStatus::Approved => "approved",
            CouponStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Coupon {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Stored upper-cased; uniqueness is checked against the normalized form.
    pub code: String,
    pub name: String,
    pub discount_percentage: f64,
    pub coupon_for: UserKind,
    pub expiry_date: Option<DateTime>,
    pub status: CouponStatus,
    pub created_by: ObjectId,
    pub approved_by: Option<ObjectId>,
    pub approved_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Coupon {
    /// A coupon may be applied to a payment or have users assigned only
    /// while approved and unexpired. Pure predicate, no side effects.
    pub fn is_usable(&self, now: DateTime) -> bool {
        self.status == CouponStatus::Approved
            && self.expiry_date.map(|expiry| expiry >= now).unwrap_or(true)
    }
}

/// Codes are compared and stored case-normalized.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Assignment of a coupon to a single end user. Unique per
/// (coupon_id, user_id, user_type); `user_type` always equals the
/// coupon's `coupon_for`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CouponUser {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub coupon_id: ObjectId,
    pub user_id: ObjectId,
    pub user_type: UserKind,
    pub assigned_by: ObjectId,
    pub assigned_at: DateTime,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateCouponDto {
    #[validate(length(min = 3, max = 32, message = "code must be 3-32 characters"))]
    pub code: String,
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: String,
    #[validate(range(min = 0.0, max = 100.0, message = "discount must be between 0 and 100"))]
    pub discount_percentage: f64,
    /// "employee" or "employer"
    pub coupon_for: String,
    /// RFC 3339 timestamp; omit for a coupon that never expires.
    pub expiry_date: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecideCouponDto {
    /// "approve" or "reject"
    pub decision: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssignUserItem {
    /// Email or phone of the target user.
    pub identifier: String,
    /// "employee" or "employer"; must match the coupon's audience.
    pub user_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssignUsersDto {
    pub users: Vec<AssignUserItem>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateCouponDto {
    pub code: String,
    pub plan_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(status: CouponStatus, expiry: Option<DateTime>) -> Coupon {
        let now = DateTime::now();
        Coupon {
            id: None,
            code: "WELCOME20".to_string(),
            name: "Welcome".to_string(),
            discount_percentage: 20.0,
            coupon_for: UserKind::Employee,
            expiry_date: expiry,
            status,
            created_by: ObjectId::new(),
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_approved_unexpired_coupons_are_usable() {
        let now = DateTime::now();
        let future = DateTime::from_millis(now.timestamp_millis() + 86_400_000);
        let past = DateTime::from_millis(now.timestamp_millis() - 86_400_000);

        assert!(coupon(CouponStatus::Approved, None).is_usable(now));
        assert!(coupon(CouponStatus::Approved, Some(future)).is_usable(now));
        assert!(!coupon(CouponStatus::Approved, Some(past)).is_usable(now));
        assert!(!coupon(CouponStatus::Pending, Some(future)).is_usable(now));
        assert!(!coupon(CouponStatus::Rejected, None).is_usable(now));
    }

    #[test]
    fn codes_normalize_to_uppercase() {
        assert_eq!(normalize_code("  welcome20 "), "WELCOME20");
        assert_eq!(normalize_code("WELCOME20"), "WELCOME20");
    }
}
