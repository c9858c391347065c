use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    CouponBased,
    Manual,
}

/// Credit to a staff member. Coupon-based rows are written in the same
/// transaction as the payment they settle; rows are never updated after
/// insertion.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommissionTransaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// The coupon's creator, not necessarily its approver.
    pub staff_id: ObjectId,
    pub payment_id: Option<ObjectId>,
    pub amount_earned: f64,
    pub commission_type: CommissionType,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ManualCommissionDto {
    pub staff_id: String,
    #[validate(range(min = 0.01, message = "amount must be positive"))]
    pub amount: f64,
    pub payment_id: Option<String>,
}
