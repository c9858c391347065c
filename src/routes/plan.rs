use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use validator::Validate;

use crate::db::DbConn;
use crate::guards::AdminGuard;
use crate::models::{CreatePlanDto, Plan, Subscription, UpdatePlanDto, UserKind};
use crate::utils::{ApiError, ApiResponse, Created};

/// At most one default plan per kind: setting the flag clears it on
/// every other plan of the same audience.
async fn unset_other_defaults(
    db: &DbConn,
    plan_for: UserKind,
    keep: Option<ObjectId>,
) -> Result<(), ApiError> {
    let mut filter = doc! { "plan_for": plan_for.as_str(), "is_default": true };
    if let Some(id) = keep {
        filter.insert("_id", doc! { "$ne": id });
    }
    db.collection::<Plan>("plans")
        .update_many(
            filter,
            doc! { "$set": { "is_default": false, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    Ok(())
}

#[openapi(tag = "Plans")]
#[get("/plans?<plan_for>")]
pub async fn list_plans(
    db: &State<DbConn>,
    plan_for: Option<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut filter = doc! {};
    if let Some(ref s) = plan_for {
        let kind = UserKind::parse(s)
            .ok_or_else(|| ApiError::bad_request("plan_for must be 'employee' or 'employer'"))?;
        filter.insert("plan_for", kind.as_str());
    }

    let mut cursor = db
        .collection::<Plan>("plans")
        .find(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut plans = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let plan = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        plans.push(plan);
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "plans": plans
    }))))
}

#[openapi(tag = "Admin - Plans")]
#[post("/admin/plans", data = "<dto>")]
pub async fn create_plan(
    db: &State<DbConn>,
    _admin: AdminGuard,
    dto: Json<CreatePlanDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    dto.validate().map_err(|e| ApiError::from_validation(&e))?;
    let plan_for = UserKind::parse(&dto.plan_for)
        .ok_or_else(|| ApiError::unprocessable("plan_for", "must be 'employee' or 'employer'"))?;

    let now = DateTime::now();
    let plan = Plan {
        id: None,
        plan_for,
        name: dto.name.clone(),
        price: dto.price,
        validity_days: dto.validity_days,
        jobs_quota: dto.jobs_quota,
        contact_views_quota: dto.contact_views_quota,
        job_alerts: dto.job_alerts.unwrap_or(false),
        free_contact_views: dto.free_contact_views.unwrap_or(false),
        is_default: dto.is_default.unwrap_or(false),
        features: dto.features.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Plan>("plans")
        .insert_one(&plan, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create plan: {}", e)))?;
    let plan_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid plan ID"))?;

    if plan.is_default {
        unset_other_defaults(db, plan_for, Some(plan_id)).await?;
    }

    Ok(Created(ApiResponse::success_with_message(
        "Plan created successfully".to_string(),
        serde_json::json!({ "id": plan_id.to_hex() }),
    )))
}

#[openapi(tag = "Admin - Plans")]
#[put("/admin/plans/<plan_id>", data = "<dto>")]
pub async fn update_plan(
    db: &State<DbConn>,
    _admin: AdminGuard,
    plan_id: String,
    dto: Json<UpdatePlanDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate().map_err(|e| ApiError::from_validation(&e))?;
    let object_id = ObjectId::parse_str(&plan_id)
        .map_err(|_| ApiError::bad_request("Invalid plan ID"))?;

    let plan = db
        .collection::<Plan>("plans")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Plan not found"))?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };
    if let Some(ref name) = dto.name {
        update_doc.insert("name", name);
    }
    if let Some(price) = dto.price {
        update_doc.insert("price", price);
    }
    if let Some(days) = dto.validity_days {
        update_doc.insert("validity_days", days);
    }
    if let Some(jobs) = dto.jobs_quota {
        update_doc.insert("jobs_quota", jobs);
    }
    if let Some(views) = dto.contact_views_quota {
        update_doc.insert("contact_views_quota", views);
    }
    if let Some(alerts) = dto.job_alerts {
        update_doc.insert("job_alerts", alerts);
    }
    if let Some(free_views) = dto.free_contact_views {
        update_doc.insert("free_contact_views", free_views);
    }
    if let Some(is_default) = dto.is_default {
        update_doc.insert("is_default", is_default);
    }
    if let Some(ref features) = dto.features {
        let features = mongodb::bson::to_bson(features)
            .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
        update_doc.insert("features", features);
    }

    db.collection::<Plan>("plans")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update plan: {}", e)))?;

    if dto.is_default == Some(true) {
        unset_other_defaults(db, plan.plan_for, Some(object_id)).await?;
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Plan updated successfully"
    }))))
}

#[openapi(tag = "Admin - Plans")]
#[delete("/admin/plans/<plan_id>")]
pub async fn delete_plan(
    db: &State<DbConn>,
    _admin: AdminGuard,
    plan_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&plan_id)
        .map_err(|_| ApiError::bad_request("Invalid plan ID"))?;

    // Refuse while subscriptions still point at the plan.
    let references = db
        .collection::<Subscription>("subscriptions")
        .count_documents(doc! { "plan_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    if references > 0 {
        return Err(ApiError::bad_request(
            "Plan has subscriptions and cannot be deleted",
        ));
    }

    let result = db
        .collection::<Plan>("plans")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete plan: {}", e)))?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Plan not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Plan deleted successfully"
    }))))
}
