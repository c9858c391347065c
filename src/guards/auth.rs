use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use mongodb::bson::oid::ObjectId;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::models::{UserKind, UserRef};

/// JWT guard for end users (employees and employers). Admin tokens are
/// rejected here; back-office endpoints use `AdminGuard`.
pub struct AuthGuard {
    pub user: UserRef,
}

pub(crate) fn bearer_claims(req: &Request<'_>) -> Option<crate::services::jwt::Claims> {
    let token = req.headers().get_one("Authorization")?;
    let token = token.trim_start_matches("Bearer ");
    crate::services::JwtService::verify_token(token, false).ok()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(claims) = bearer_claims(req) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        let Some(kind) = UserKind::parse(&claims.kind) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        match ObjectId::parse_str(&claims.sub) {
            Ok(id) => Outcome::Success(AuthGuard {
                user: UserRef { id, kind },
            }),
            Err(_) => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

pub(crate) use bearer_claims as claims_from_request;
