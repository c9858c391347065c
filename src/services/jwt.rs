use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// "employee", "employer" or "admin"
    pub kind: String,
    /// Admin role, absent for end users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService;

impl JwtService {
    pub fn generate_access_token(
        principal_id: &ObjectId,
        kind: &str,
        role: Option<&str>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        Self::generate(
            principal_id,
            kind,
            role,
            crate::config::Config::jwt_expiry(),
            &crate::config::Config::jwt_secret(),
        )
    }

    pub fn generate_refresh_token(
        principal_id: &ObjectId,
        kind: &str,
        role: Option<&str>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        Self::generate(
            principal_id,
            kind,
            role,
            crate::config::Config::jwt_refresh_expiry(),
            &crate::config::Config::jwt_refresh_secret(),
        )
    }

    fn generate(
        principal_id: &ObjectId,
        kind: &str,
        role: Option<&str>,
        expiry: i64,
        secret: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            sub: principal_id.to_hex(),
            kind: kind.to_string(),
            role: role.map(str::to_string),
            exp: now + expiry,
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn verify_token(token: &str, is_refresh: bool) -> Result<Claims, jsonwebtoken::errors::Error> {
        let secret = if is_refresh {
            crate::config::Config::jwt_refresh_secret()
        } else {
            crate::config::Config::jwt_secret()
        };

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips_principal_and_role() {
        let id = ObjectId::new();
        let token = JwtService::generate_access_token(&id, "admin", Some("staff")).unwrap();
        let claims = JwtService::verify_token(&token, false).unwrap();
        assert_eq!(claims.sub, id.to_hex());
        assert_eq!(claims.kind, "admin");
        assert_eq!(claims.role.as_deref(), Some("staff"));
    }

    #[test]
    fn refresh_secret_does_not_validate_access_tokens() {
        let id = ObjectId::new();
        let token = JwtService::generate_access_token(&id, "employee", None).unwrap();
        assert!(JwtService::verify_token(&token, true).is_err());
    }
}
