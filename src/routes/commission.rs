use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use validator::Validate;

use crate::db::DbConn;
use crate::guards::{AdminGuard, SuperAdminGuard};
use crate::models::{Admin, CommissionTransaction, CommissionType, ManualCommissionDto};
use crate::routes::admin::scoped_staff_ids;
use crate::services::settlement;
use crate::utils::{page_window, ApiError, ApiResponse, Created};

/// Direct credit outside the coupon flow. No approval workflow; the
/// row is final the moment it is written.
#[openapi(tag = "Admin - Commissions")]
#[post("/admin/commissions", data = "<dto>")]
pub async fn add_manual_commission(
    db: &State<DbConn>,
    _admin: SuperAdminGuard,
    dto: Json<ManualCommissionDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    dto.validate().map_err(|e| ApiError::from_validation(&e))?;

    let staff_id = ObjectId::parse_str(&dto.staff_id)
        .map_err(|_| ApiError::unprocessable("staff_id", "invalid id"))?;
    let staff = db
        .collection::<Admin>("admins")
        .find_one(doc! { "_id": staff_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if staff.is_none() {
        return Err(ApiError::not_found("Staff member not found"));
    }

    let payment_id = match &dto.payment_id {
        Some(raw) => Some(
            ObjectId::parse_str(raw)
                .map_err(|_| ApiError::unprocessable("payment_id", "invalid id"))?,
        ),
        None => None,
    };

    let commission = CommissionTransaction {
        id: None,
        staff_id,
        payment_id,
        amount_earned: settlement::round2(dto.amount),
        commission_type: CommissionType::Manual,
        created_at: DateTime::now(),
    };
    let result = db
        .collection::<CommissionTransaction>("commission_transactions")
        .insert_one(&commission, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create commission: {}", e)))?;

    Ok(Created(ApiResponse::success_with_message(
        "Commission recorded".to_string(),
        serde_json::json!({
            "id": result.inserted_id.as_object_id().map(|id| id.to_hex()),
            "amount_earned": settlement::money(commission.amount_earned),
        }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct CommissionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Role-filtered: staff see their own earnings, managers their team's,
/// super admins everything.
#[openapi(tag = "Admin - Commissions")]
#[get("/admin/commissions?<query..>")]
pub async fn list_commissions(
    db: &State<DbConn>,
    admin: AdminGuard,
    query: CommissionListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (page, limit, skip) = page_window(query.page, query.limit);

    let filter = match scoped_staff_ids(db, &admin).await? {
        None => doc! {},
        Some(ids) => doc! { "staff_id": { "$in": ids } },
    };

    let find_options = FindOptions::builder()
        .skip(skip)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db
        .collection::<CommissionTransaction>("commission_transactions")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut commissions = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let commission: CommissionTransaction = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        commissions.push(serde_json::json!({
            "id": commission.id.map(|id| id.to_hex()),
            "staff_id": commission.staff_id.to_hex(),
            "payment_id": commission.payment_id.map(|id| id.to_hex()),
            "amount_earned": settlement::money(commission.amount_earned),
            "commission_type": commission.commission_type,
            "created_at": commission.created_at,
        }));
    }

    let total = db
        .collection::<CommissionTransaction>("commission_transactions")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "commissions": commissions,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}
