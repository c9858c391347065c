use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime};
use mongodb::options::FindOptions;
use validator::Validate;

use crate::db::DbConn;
use crate::guards::{AdminGuard, AuthGuard};
use crate::models::{
    normalize_code, AssignUsersDto, Coupon, CouponStatus, CouponUser, CreateCouponDto,
    DecideCouponDto, EndUser, Plan, UserKind, ValidateCouponDto,
};
use crate::routes::admin::{ensure_staff_scope, scoped_staff_ids};
use crate::services::settlement;
use crate::utils::{page_window, ApiError, ApiResponse, Created};

fn parse_expiry(raw: &Option<String>) -> Result<Option<DateTime>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .map_err(|_| ApiError::unprocessable("expiry_date", "must be an RFC 3339 timestamp"))?;
    let expiry = DateTime::from_millis(parsed.timestamp_millis());
    if expiry < DateTime::now() {
        return Err(ApiError::unprocessable("expiry_date", "must not be in the past"));
    }
    Ok(Some(expiry))
}

async fn load_coupon(db: &DbConn, coupon_id: &str) -> Result<Coupon, ApiError> {
    let object_id = ObjectId::parse_str(coupon_id)
        .map_err(|_| ApiError::bad_request("Invalid coupon ID"))?;
    db.collection::<Coupon>("coupons")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Coupon not found"))
}

#[openapi(tag = "Admin - Coupons")]
#[post("/admin/coupons", data = "<dto>")]
pub async fn create_coupon(
    db: &State<DbConn>,
    admin: AdminGuard,
    dto: Json<CreateCouponDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    dto.validate().map_err(|e| ApiError::from_validation(&e))?;
    let coupon_for = UserKind::parse(&dto.coupon_for)
        .ok_or_else(|| ApiError::unprocessable("coupon_for", "must be 'employee' or 'employer'"))?;
    let expiry_date = parse_expiry(&dto.expiry_date)?;

    let code = normalize_code(&dto.code);
    let coupons = db.collection::<Coupon>("coupons");

    let existing = coupons
        .find_one(doc! { "code": &code }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::unprocessable("code", "has already been taken"));
    }

    let now = DateTime::now();
    let coupon = Coupon {
        id: None,
        code,
        name: dto.name.clone(),
        discount_percentage: dto.discount_percentage,
        coupon_for,
        expiry_date,
        status: CouponStatus::Pending,
        created_by: admin.admin_id,
        approved_by: None,
        approved_at: None,
        created_at: now,
        updated_at: now,
    };

    // The existence check above can race a concurrent create; the unique
    // index on `code` settles it, and the loser gets the same 422.
    let result = match coupons.insert_one(&coupon, None).await {
        Ok(result) => result,
        Err(e) if crate::db::is_duplicate_key(&e) => {
            return Err(ApiError::unprocessable("code", "has already been taken"));
        }
        Err(e) => {
            return Err(ApiError::internal_error(format!("Failed to create coupon: {}", e)));
        }
    };

    Ok(Created(ApiResponse::success_with_message(
        "Coupon created and awaiting approval".to_string(),
        serde_json::json!({
            "id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
            "code": coupon.code,
            "status": coupon.status,
        }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct CouponListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Coupons")]
#[get("/admin/coupons?<query..>")]
pub async fn list_coupons(
    db: &State<DbConn>,
    admin: AdminGuard,
    query: CouponListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (page, limit, skip) = page_window(query.page, query.limit);

    let mut filter = match scoped_staff_ids(db, &admin).await? {
        None => doc! {},
        Some(ids) => doc! { "created_by": { "$in": ids } },
    };
    if let Some(status) = query.status {
        filter.insert("status", status);
    }

    let find_options = FindOptions::builder()
        .skip(skip)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db
        .collection::<Coupon>("coupons")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut coupons = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let coupon = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        coupons.push(coupon);
    }

    let total = db
        .collection::<Coupon>("coupons")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "coupons": coupons,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

/// Approve or reject. The status filter doubles as a compare-and-set:
/// when two admins race, one update matches zero documents and gets the
/// state error instead of silently re-deciding.
#[openapi(tag = "Admin - Coupons")]
#[put("/admin/coupons/<coupon_id>/approve", data = "<dto>")]
pub async fn decide_coupon(
    db: &State<DbConn>,
    admin: AdminGuard,
    coupon_id: String,
    dto: Json<DecideCouponDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let next = match dto.decision.as_str() {
        "approve" => CouponStatus::Approved,
        "reject" => CouponStatus::Rejected,
        _ => return Err(ApiError::bad_request("decision must be 'approve' or 'reject'")),
    };

    let coupon = load_coupon(db, &coupon_id).await?;
    ensure_staff_scope(db, &admin, coupon.created_by).await?;

    let result = db
        .collection::<Coupon>("coupons")
        .update_one(
            doc! { "_id": coupon.id, "status": "pending" },
            doc! { "$set": {
                "status": next.as_str(),
                "approved_by": admin.admin_id,
                "approved_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update coupon: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::bad_request("Coupon has already been decided"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": coupon_id,
        "status": next,
    }))))
}

/// Batch assignment. Item-level problems (unknown user, wrong kind,
/// duplicate) are reported per item and never abort the batch; only the
/// pre-loop authorization and state checks raise.
#[openapi(tag = "Admin - Coupons")]
#[post("/admin/coupons/<coupon_id>/assign-users", data = "<dto>")]
pub async fn assign_users(
    db: &State<DbConn>,
    admin: AdminGuard,
    coupon_id: String,
    dto: Json<AssignUsersDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let coupon = load_coupon(db, &coupon_id).await?;
    ensure_staff_scope(db, &admin, coupon.created_by).await?;

    if coupon.status != CouponStatus::Approved {
        return Err(ApiError::bad_request("Coupon is not approved"));
    }
    if !coupon.is_usable(DateTime::now()) {
        return Err(ApiError::bad_request("Coupon has expired"));
    }
    let coupon_oid = coupon.id.ok_or_else(|| ApiError::internal_error("Coupon missing ID"))?;

    let mut session = db
        .client
        .start_session(None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session error: {}", e)))?;
    session
        .start_transaction(None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Transaction error: {}", e)))?;

    let mut assigned = Vec::new();
    let mut failed = Vec::new();

    for item in &dto.users {
        let fail = |reason: &str| {
            serde_json::json!({
                "identifier": &item.identifier,
                "user_type": &item.user_type,
                "reason": reason,
            })
        };

        let Some(user_type) = UserKind::parse(&item.user_type) else {
            failed.push(fail("unknown user type"));
            continue;
        };
        if user_type != coupon.coupon_for {
            failed.push(fail("user type does not match coupon audience"));
            continue;
        }

        let lookup = db
            .collection::<EndUser>(user_type.collection())
            .find_one_with_session(
                doc! { "$or": [
                    { "email": item.identifier.to_lowercase() },
                    { "phone": &item.identifier },
                ]},
                None,
                &mut session,
            )
            .await;
        let user = match lookup {
            Ok(Some(user)) => user,
            Ok(None) => {
                failed.push(fail("user not found"));
                continue;
            }
            Err(e) => {
                let _ = session.abort_transaction().await;
                return Err(ApiError::internal_error(format!("Database error: {}", e)));
            }
        };
        let user_id = match user.id {
            Some(id) => id,
            None => {
                failed.push(fail("user not found"));
                continue;
            }
        };

        let duplicate = db
            .collection::<CouponUser>("coupon_users")
            .find_one_with_session(
                doc! {
                    "coupon_id": coupon_oid,
                    "user_id": user_id,
                    "user_type": user_type.as_str(),
                },
                None,
                &mut session,
            )
            .await;
        match duplicate {
            Ok(Some(_)) => {
                failed.push(fail("user is already assigned to this coupon"));
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                let _ = session.abort_transaction().await;
                return Err(ApiError::internal_error(format!("Database error: {}", e)));
            }
        }

        let assignment = CouponUser {
            id: None,
            coupon_id: coupon_oid,
            user_id,
            user_type,
            assigned_by: admin.admin_id,
            assigned_at: DateTime::now(),
        };
        let inserted = db
            .collection::<CouponUser>("coupon_users")
            .insert_one_with_session(&assignment, None, &mut session)
            .await;
        match inserted {
            Ok(result) => assigned.push(serde_json::json!({
                "identifier": &item.identifier,
                "user_id": user_id.to_hex(),
                "assignment_id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
            })),
            Err(e) => {
                let _ = session.abort_transaction().await;
                return Err(ApiError::internal_error(format!("Failed to assign user: {}", e)));
            }
        }
    }

    session
        .commit_transaction()
        .await
        .map_err(|e| ApiError::internal_error(format!("Commit failed: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "assigned": assigned,
        "failed": failed,
        "assigned_count": assigned.len(),
        "failed_count": failed.len(),
    }))))
}

#[openapi(tag = "Admin - Coupons")]
#[delete("/admin/coupons/<coupon_id>/assignments/<assignment_id>")]
pub async fn remove_assignment(
    db: &State<DbConn>,
    admin: AdminGuard,
    coupon_id: String,
    assignment_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let coupon = load_coupon(db, &coupon_id).await?;
    ensure_staff_scope(db, &admin, coupon.created_by).await?;

    let assignment_oid = ObjectId::parse_str(&assignment_id)
        .map_err(|_| ApiError::bad_request("Invalid assignment ID"))?;

    let result = db
        .collection::<CouponUser>("coupon_users")
        .delete_one(
            doc! { "_id": assignment_oid, "coupon_id": coupon.id },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to remove assignment: {}", e)))?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Assignment not found for this coupon"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Assignment removed"
    }))))
}

#[openapi(tag = "Admin - Coupons")]
#[delete("/admin/coupons/<coupon_id>")]
pub async fn delete_coupon(
    db: &State<DbConn>,
    admin: AdminGuard,
    coupon_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let coupon = load_coupon(db, &coupon_id).await?;
    ensure_staff_scope(db, &admin, coupon.created_by).await?;

    let assignments = db
        .collection::<CouponUser>("coupon_users")
        .count_documents(doc! { "coupon_id": coupon.id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    if assignments > 0 {
        return Err(ApiError::bad_request(
            "Coupon has assigned users and cannot be deleted",
        ));
    }

    db.collection::<Coupon>("coupons")
        .delete_one(doc! { "_id": coupon.id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete coupon: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Coupon deleted successfully"
    }))))
}

/// Pure read: prices a coupon against a plan without touching any state.
/// A non-matching code is a `valid: false` payload, never an error.
#[openapi(tag = "Coupons")]
#[post("/coupons/validate", data = "<dto>")]
pub async fn validate_coupon(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<ValidateCouponDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let plan_oid = ObjectId::parse_str(&dto.plan_id)
        .map_err(|_| ApiError::bad_request("Invalid plan ID"))?;
    let plan = db
        .collection::<Plan>("plans")
        .find_one(doc! { "_id": plan_oid }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Plan not found"))?;

    let coupon = find_usable_coupon(db, &dto.code, auth.user.kind).await?;

    let Some(coupon) = coupon else {
        return Ok(Json(ApiResponse::success(serde_json::json!({
            "valid": false,
        }))));
    };

    let quote = settlement::quote(plan.price, Some(coupon.discount_percentage));
    Ok(Json(ApiResponse::success(serde_json::json!({
        "valid": true,
        "code": coupon.code,
        "discount_percentage": coupon.discount_percentage,
        "original_amount": settlement::money(quote.original),
        "discount_amount": settlement::money(quote.discount),
        "final_amount": settlement::money(quote.total),
    }))))
}

/// Shared lookup for validate and subscribe: approved, unexpired, and
/// aimed at the caller's kind. Approval is required on both paths so the
/// quoted price always matches the settled one.
pub async fn find_usable_coupon(
    db: &DbConn,
    code: &str,
    kind: UserKind,
) -> Result<Option<Coupon>, ApiError> {
    db.collection::<Coupon>("coupons")
        .find_one(
            doc! {
                "code": normalize_code(code),
                "coupon_for": kind.as_str(),
                "status": "approved",
                "$or": [
                    { "expiry_date": Bson::Null },
                    { "expiry_date": { "$gte": DateTime::now() } },
                ],
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
}
