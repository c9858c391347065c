use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::doc;
use validator::Validate;

use crate::db::DbConn;
use crate::models::{Admin, EndUser, LoginDto, RefreshTokenDto, RegisterDto, UserKind, UserRef};
use crate::routes::subscription::grant_default_plan;
use crate::services::JwtService;
use crate::utils::{validate_phone, ApiError, ApiResponse, Created};

async fn register(
    db: &DbConn,
    kind: UserKind,
    dto: &RegisterDto,
) -> Result<serde_json::Value, ApiError> {
    dto.validate().map_err(|e| ApiError::from_validation(&e))?;
    if !validate_phone(&dto.phone) {
        return Err(ApiError::unprocessable("phone", "invalid phone number"));
    }

    let users = db.collection::<EndUser>(kind.collection());

    let existing = users
        .find_one(doc! { "email": dto.email.to_lowercase() }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::unprocessable("email", "has already been taken"));
    }

    let user = EndUser::new(&dto.name, &dto.email, &dto.phone, &dto.password)
        .map_err(|e| ApiError::internal_error(format!("Password hashing failed: {}", e)))?;

    let result = users
        .insert_one(&user, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create account: {}", e)))?;
    let user_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid account ID"))?;

    let user_ref = UserRef { id: user_id, kind };

    // Free tier, when one is configured for this kind.
    let default_plan = grant_default_plan(db, &user_ref).await?;

    let access_token = JwtService::generate_access_token(&user_id, kind.as_str(), None)
        .map_err(|e| ApiError::internal_error(format!("Token generation failed: {}", e)))?;
    let refresh_token = JwtService::generate_refresh_token(&user_id, kind.as_str(), None)
        .map_err(|e| ApiError::internal_error(format!("Token generation failed: {}", e)))?;

    Ok(serde_json::json!({
        "id": user_id.to_hex(),
        "kind": kind.as_str(),
        "default_plan_id": default_plan.map(|id| id.to_hex()),
        "access_token": access_token,
        "refresh_token": refresh_token,
    }))
}

#[openapi(tag = "Auth")]
#[post("/auth/register/employee", data = "<dto>")]
pub async fn register_employee(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    let data = register(db, UserKind::Employee, &dto).await?;
    Ok(Created(ApiResponse::success_with_message(
        "Employee account created".to_string(),
        data,
    )))
}

#[openapi(tag = "Auth")]
#[post("/auth/register/employer", data = "<dto>")]
pub async fn register_employer(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<Created<serde_json::Value>, ApiError> {
    let data = register(db, UserKind::Employer, &dto).await?;
    Ok(Created(ApiResponse::success_with_message(
        "Employer account created".to_string(),
        data,
    )))
}

#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let email = dto.email.to_lowercase();

    let (principal_id, role) = match dto.kind.as_str() {
        "admin" => {
            let admin = db
                .collection::<Admin>("admins")
                .find_one(doc! { "email": &email, "is_active": true }, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .filter(|a| a.verify_password(&dto.password))
                .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
            (admin.id.unwrap(), Some(admin.role.as_str().to_string()))
        }
        kind_str => {
            let kind = UserKind::parse(kind_str)
                .ok_or_else(|| ApiError::bad_request("kind must be employee, employer or admin"))?;
            let user = db
                .collection::<EndUser>(kind.collection())
                .find_one(doc! { "email": &email, "is_active": true }, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .filter(|u| u.verify_password(&dto.password))
                .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
            (user.id.unwrap(), None)
        }
    };

    let access_token =
        JwtService::generate_access_token(&principal_id, &dto.kind, role.as_deref())
            .map_err(|e| ApiError::internal_error(format!("Token generation failed: {}", e)))?;
    let refresh_token =
        JwtService::generate_refresh_token(&principal_id, &dto.kind, role.as_deref())
            .map_err(|e| ApiError::internal_error(format!("Token generation failed: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": principal_id.to_hex(),
        "kind": &dto.kind,
        "role": role,
        "access_token": access_token,
        "refresh_token": refresh_token,
    }))))
}

#[openapi(tag = "Auth")]
#[post("/auth/refresh", data = "<dto>")]
pub async fn refresh_token(
    dto: Json<RefreshTokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let claims = JwtService::verify_token(&dto.refresh_token, true)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let principal_id = mongodb::bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let access_token =
        JwtService::generate_access_token(&principal_id, &claims.kind, claims.role.as_deref())
            .map_err(|e| ApiError::internal_error(format!("Token generation failed: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "access_token": access_token,
    }))))
}
