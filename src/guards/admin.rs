use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use mongodb::bson::{doc, oid::ObjectId};

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::db::DbConn;
use crate::guards::auth::claims_from_request;
use crate::models::{Admin, AdminRole};

/// Back-office guard. The admin document is re-read on every request so
/// a deactivated account or a demoted role takes effect immediately,
/// and `manager_id` is available for the one-level scope checks.
pub struct AdminGuard {
    pub admin_id: ObjectId,
    pub role: AdminRole,
    pub manager_id: Option<ObjectId>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(claims) = claims_from_request(req) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        if claims.kind != "admin" {
            return Outcome::Error((Status::Forbidden, ()));
        }
        let Ok(admin_id) = ObjectId::parse_str(&claims.sub) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        let Some(db) = req.rocket().state::<DbConn>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };

        let admin = db
            .collection::<Admin>("admins")
            .find_one(doc! { "_id": admin_id, "is_active": true }, None)
            .await;

        match admin {
            Ok(Some(admin)) => Outcome::Success(AdminGuard {
                admin_id,
                role: admin.role,
                manager_id: admin.manager_id,
            }),
            Ok(None) => Outcome::Error((Status::Forbidden, ())),
            Err(e) => {
                error!("Admin guard lookup failed: {}", e);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

/// Narrows `AdminGuard` to super admins before the handler runs.
pub struct SuperAdminGuard(pub AdminGuard);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SuperAdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<AdminGuard>().await {
            Outcome::Success(admin) if admin.role == AdminRole::SuperAdmin => {
                Outcome::Success(SuperAdminGuard(admin))
            }
            Outcome::Success(_) => Outcome::Error((Status::Forbidden, ())),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for SuperAdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
