use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use super::principal::AdminRole;

/// Employee / employer account document. Both kinds share this shape and
/// live in their own collections (`employees`, `employers`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndUser {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub plan_id: Option<ObjectId>,
    pub subscription_id: Option<ObjectId>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl EndUser {
    /// Hashes the password up front; plaintext never reaches a document.
    pub fn new(name: &str, email: &str, phone: &str, password: &str) -> Result<Self, bcrypt::BcryptError> {
        let now = DateTime::now();
        Ok(EndUser {
            id: None,
            name: name.to_string(),
            email: email.to_lowercase(),
            phone: phone.to_string(),
            password_hash: bcrypt::hash(password, bcrypt::DEFAULT_COST)?,
            plan_id: None,
            subscription_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

/// Back-office account. `manager_id` gives the one-level staff → manager
/// hierarchy the coupon authorization rules walk.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub manager_id: Option<ObjectId>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Admin {
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        role: AdminRole,
        manager_id: Option<ObjectId>,
    ) -> Result<Self, bcrypt::BcryptError> {
        let now = DateTime::now();
        Ok(Admin {
            id: None,
            name: name.to_string(),
            email: email.to_lowercase(),
            password_hash: bcrypt::hash(password, bcrypt::DEFAULT_COST)?,
            role,
            manager_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct RegisterDto {
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    pub phone: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    /// "employee", "employer" or "admin"
    pub kind: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefreshTokenDto {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateStaffDto {
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    /// "manager" or "staff"
    pub role: String,
    pub manager_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_hashed_on_construction() {
        let user = EndUser::new("Asha", "asha@example.com", "9876543210", "s3cret-pass").unwrap();
        assert_ne!(user.password_hash, "s3cret-pass");
        assert!(user.verify_password("s3cret-pass"));
        assert!(!user.verify_password("wrong"));
    }

    #[test]
    fn email_is_normalized_to_lowercase() {
        let admin =
            Admin::new("Ops", "Ops@Example.COM", "longenough", AdminRole::Staff, None).unwrap();
        assert_eq!(admin.email, "ops@example.com");
    }
}
