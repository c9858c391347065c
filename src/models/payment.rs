use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use super::principal::UserKind;

/// Created pending, settled to completed inside the subscribe
/// transaction (stub gateway, so no asynchronous capture), or failed.
/// Completed and failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub user_type: UserKind,
    pub plan_id: ObjectId,
    pub coupon_id: Option<ObjectId>,
    pub original_amount: f64,
    pub discount_amount: f64,
    /// original − discount, never below zero.
    pub amount: f64,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubscribeDto {
    pub plan_id: String,
    pub coupon_code: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerifyPaymentDto {
    pub payment_id: String,
    pub transaction_id: String,
}
