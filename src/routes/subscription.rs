use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{EndUser, Plan, QuotaKind, Subscription, UserRef, UNLIMITED};
use crate::utils::{ApiError, ApiResponse};

/// Attach the kind's default plan (if one exists) as a paymentless
/// subscription. Used on registration.
pub async fn grant_default_plan(
    db: &DbConn,
    owner: &UserRef,
) -> Result<Option<ObjectId>, ApiError> {
    let plan = db
        .collection::<Plan>("plans")
        .find_one(
            doc! { "plan_for": owner.kind.as_str(), "is_default": true },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let Some(plan) = plan else {
        return Ok(None);
    };

    let now = DateTime::now();
    let subscription = Subscription::from_plan(owner, &plan, None, now);
    let inserted = db
        .collection::<Subscription>("subscriptions")
        .insert_one(&subscription, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create subscription: {}", e)))?;

    db.collection::<EndUser>(owner.kind.collection())
        .update_one(
            doc! { "_id": owner.id },
            doc! { "$set": {
                "plan_id": plan.id,
                "subscription_id": inserted.inserted_id.as_object_id(),
                "updated_at": now,
            }},
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update account: {}", e)))?;

    Ok(plan.id)
}

/// Flip owner's active-but-expired rows before reading or consuming.
async fn expire_stale(db: &DbConn, owner: &UserRef) -> Result<(), ApiError> {
    db.collection::<Subscription>("subscriptions")
        .update_many(
            doc! {
                "owner_id": owner.id,
                "owner_kind": owner.kind.as_str(),
                "status": "active",
                "expires_at": { "$lt": DateTime::now() },
            },
            doc! { "$set": { "status": "expired", "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    Ok(())
}

#[openapi(tag = "Subscription")]
#[get("/subscription/status")]
pub async fn get_subscription_status(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    expire_stale(db, &auth.user).await?;

    let subscription = db
        .collection::<Subscription>("subscriptions")
        .find_one(
            doc! {
                "owner_id": auth.user.id,
                "owner_kind": auth.user.kind.as_str(),
                "status": "active",
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let Some(sub) = subscription else {
        return Ok(Json(ApiResponse::success(serde_json::json!({
            "has_subscription": false,
            "subscription": null,
        }))));
    };

    let plan = db
        .collection::<Plan>("plans")
        .find_one(doc! { "_id": sub.plan_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "has_subscription": true,
        "subscription": {
            "id": sub.id.map(|id| id.to_hex()),
            "plan_id": sub.plan_id.to_hex(),
            "plan_name": plan.map(|p| p.name),
            "is_default": sub.is_default,
            "started_at": sub.started_at,
            "expires_at": sub.expires_at,
            "jobs_remaining": sub.jobs_remaining,
            "contact_views_remaining": sub.contact_views_remaining,
        }
    }))))
}

/// One quota-consuming action (job apply/post or contact view). The
/// decrement is a single conditional update so concurrent consumers
/// cannot drive a counter below zero; -1 quotas match the unlimited
/// branch and are left untouched.
#[openapi(tag = "Subscription")]
#[post("/subscription/consume/<quota>")]
pub async fn consume_quota(
    db: &State<DbConn>,
    auth: AuthGuard,
    quota: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let kind = QuotaKind::parse(&quota)
        .ok_or_else(|| ApiError::bad_request("Unknown quota (use 'jobs' or 'contact-views')"))?;
    let field = kind.field();

    expire_stale(db, &auth.user).await?;

    let subscriptions = db.collection::<Subscription>("subscriptions");
    let owner_filter = doc! {
        "owner_id": auth.user.id,
        "owner_kind": auth.user.kind.as_str(),
        "status": "active",
    };

    // Unlimited plans consume nothing.
    let mut unlimited_filter = owner_filter.clone();
    unlimited_filter.insert(field, UNLIMITED);
    let unlimited = subscriptions
        .update_one(
            unlimited_filter,
            doc! { "$set": { "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if unlimited.matched_count > 0 {
        return Ok(Json(ApiResponse::success(serde_json::json!({
            "consumed": quota,
            "remaining": UNLIMITED,
        }))));
    }

    let mut decrement_filter = owner_filter.clone();
    decrement_filter.insert(field, doc! { "$gt": 0 });
    let decremented = subscriptions
        .update_one(
            decrement_filter,
            doc! { "$inc": { field: -1 }, "$set": { "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if decremented.matched_count == 0 {
        let active = subscriptions
            .find_one(owner_filter, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        return Err(match active {
            Some(_) => ApiError::bad_request("Quota exhausted for the current plan"),
            None => ApiError::bad_request("No active subscription"),
        });
    }

    let remaining = subscriptions
        .find_one(
            doc! {
                "owner_id": auth.user.id,
                "owner_kind": auth.user.kind.as_str(),
                "status": "active",
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .map(|sub| match kind {
            QuotaKind::Jobs => sub.jobs_remaining,
            QuotaKind::ContactViews => sub.contact_views_remaining,
        })
        .unwrap_or(0);

    Ok(Json(ApiResponse::success(serde_json::json!({
        "consumed": quota,
        "remaining": remaining,
    }))))
}
