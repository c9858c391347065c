use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use validator::Validate;

use crate::db::DbConn;
use crate::guards::{AdminGuard, SuperAdminGuard};
use crate::models::{Admin, AdminRole, CreateStaffDto};
use crate::utils::{ApiError, ApiResponse, Created};

/// Staff ids whose records this admin may act on. `None` means
/// unrestricted (super admin); managers see themselves plus their
/// direct reports (one level, via `manager_id`); staff see only
/// themselves.
pub async fn scoped_staff_ids(
    db: &DbConn,
    admin: &AdminGuard,
) -> Result<Option<Vec<ObjectId>>, ApiError> {
    match admin.role {
        AdminRole::SuperAdmin => Ok(None),
        AdminRole::Staff => Ok(Some(vec![admin.admin_id])),
        AdminRole::Manager => {
            let mut ids = vec![admin.admin_id];
            let mut cursor = db
                .collection::<Admin>("admins")
                .find(doc! { "manager_id": admin.admin_id }, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
            while cursor
                .advance()
                .await
                .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
            {
                let report = cursor
                    .deserialize_current()
                    .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
                if let Some(id) = report.id {
                    ids.push(id);
                }
            }
            Ok(Some(ids))
        }
    }
}

/// Ownership check for single-record actions (coupon decide/assign/etc).
pub async fn ensure_staff_scope(
    db: &DbConn,
    admin: &AdminGuard,
    record_owner: ObjectId,
) -> Result<(), ApiError> {
    match scoped_staff_ids(db, admin).await? {
        None => Ok(()),
        Some(ids) if ids.contains(&record_owner) => Ok(()),
        Some(_) => Err(ApiError::forbidden(
            "You do not have access to this record",
        )),
    }
}

#[openapi(tag = "Admin - Staff")]
#[post("/admin/staff", data = "<dto>")]
pub async fn create_staff(
    db: &State<DbConn>,
    _admin: SuperAdminGuard,
    dto: Json<CreateStaffDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    dto.validate().map_err(|e| ApiError::from_validation(&e))?;

    let role = match AdminRole::parse(&dto.role) {
        Some(AdminRole::SuperAdmin) | None => {
            return Err(ApiError::unprocessable("role", "must be 'manager' or 'staff'"));
        }
        Some(role) => role,
    };

    let manager_id = match &dto.manager_id {
        Some(raw) => {
            let id = ObjectId::parse_str(raw)
                .map_err(|_| ApiError::unprocessable("manager_id", "invalid id"))?;
            let manager = db
                .collection::<Admin>("admins")
                .find_one(doc! { "_id": id, "role": "manager" }, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
            if manager.is_none() {
                return Err(ApiError::unprocessable("manager_id", "manager not found"));
            }
            Some(id)
        }
        None => None,
    };

    let existing = db
        .collection::<Admin>("admins")
        .find_one(doc! { "email": dto.email.to_lowercase() }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::unprocessable("email", "has already been taken"));
    }

    let admin = Admin::new(&dto.name, &dto.email, &dto.password, role, manager_id)
        .map_err(|e| ApiError::internal_error(format!("Password hashing failed: {}", e)))?;
    let result = db
        .collection::<Admin>("admins")
        .insert_one(&admin, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create staff: {}", e)))?;

    Ok(Created(ApiResponse::success_with_message(
        "Staff account created".to_string(),
        serde_json::json!({
            "id": result.inserted_id.as_object_id().map(|id| id.to_hex())
        }),
    )))
}

#[openapi(tag = "Admin - Staff")]
#[get("/admin/staff")]
pub async fn list_staff(
    db: &State<DbConn>,
    admin: AdminGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let filter = match scoped_staff_ids(db, &admin).await? {
        None => doc! {},
        Some(ids) => doc! { "_id": { "$in": ids } },
    };

    let mut cursor = db
        .collection::<Admin>("admins")
        .find(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut staff = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let member: Admin = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        staff.push(serde_json::json!({
            "id": member.id.map(|id| id.to_hex()),
            "name": member.name,
            "email": member.email,
            "role": member.role,
            "manager_id": member.manager_id.map(|id| id.to_hex()),
            "is_active": member.is_active,
        }));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "staff": staff
    }))))
}

/// Deactivation instead of deletion keeps commission attribution intact.
#[openapi(tag = "Admin - Staff")]
#[put("/admin/staff/<staff_id>/deactivate")]
pub async fn deactivate_staff(
    db: &State<DbConn>,
    _admin: SuperAdminGuard,
    staff_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&staff_id)
        .map_err(|_| ApiError::bad_request("Invalid staff ID"))?;

    let result = db
        .collection::<Admin>("admins")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "is_active": false, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update staff: {}", e)))?;
    if result.matched_count == 0 {
        return Err(ApiError::not_found("Staff member not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Staff member deactivated"
    }))))
}
