use mongodb::{Client, Collection, Database};
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use rocket::fairing::AdHoc;

use crate::models::{Admin, AdminRole};

/// Managed handle: the `Client` is needed for multi-document sessions,
/// everything else goes through the default database.
pub struct DbConn {
    pub client: Client,
    database: Database,
}

impl DbConn {
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }
}

pub fn init() -> AdHoc {
    AdHoc::on_ignite("MongoDB", |rocket| async {
        match connect().await {
            Ok(conn) => {
                info!("✓ MongoDB connected successfully");
                if let Err(e) = ensure_indexes(&conn).await {
                    warn!("Index creation failed: {}", e);
                }
                if let Err(e) = bootstrap_admin(&conn).await {
                    warn!("Admin bootstrap failed: {}", e);
                }
                rocket.manage(conn)
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                rocket
            }
        }
    })
}

async fn connect() -> Result<DbConn, mongodb::error::Error> {
    let uri = crate::config::Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;

    let database = client.database("talentgate");
    Ok(DbConn { client, database })
}

/// Unique indexes backing the invariants the write paths rely on:
/// coupon codes are globally unique, an assignment exists at most once
/// per (coupon, user, user_type), principal emails are unique per kind.
async fn ensure_indexes(db: &DbConn) -> Result<(), mongodb::error::Error> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<mongodb::bson::Document>("coupons")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "code": 1 })
                .options(unique.clone())
                .build(),
            None,
        )
        .await?;

    db.collection::<mongodb::bson::Document>("coupon_users")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "coupon_id": 1, "user_id": 1, "user_type": 1 })
                .options(unique.clone())
                .build(),
            None,
        )
        .await?;

    for coll in ["employees", "employers", "admins"] {
        db.collection::<mongodb::bson::Document>(coll)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;
    }

    db.collection::<mongodb::bson::Document>("subscriptions")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "owner_id": 1, "owner_kind": 1, "status": 1 })
                .build(),
            None,
        )
        .await?;

    Ok(())
}

/// Server error 11000: an insert collided with one of the unique
/// indexes above. Write paths that race their own existence check map
/// this back to the same validation error the check produces.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) => write_error.code == 11000,
        ErrorKind::Command(ref command_error) => command_error.code == 11000,
        _ => false,
    }
}

/// First-run convenience: create the super admin from Rocket.toml when the
/// admins collection is empty.
async fn bootstrap_admin(db: &DbConn) -> Result<(), String> {
    let admins = db.collection::<Admin>("admins");
    let count = admins
        .count_documents(None, None)
        .await
        .map_err(|e| e.to_string())?;
    if count > 0 {
        return Ok(());
    }

    let (Some(email), Some(password)) = (
        crate::config::Config::bootstrap_admin_email(),
        crate::config::Config::bootstrap_admin_password(),
    ) else {
        return Ok(());
    };

    let admin = Admin::new("Bootstrap Admin", &email, &password, AdminRole::SuperAdmin, None)
        .map_err(|e| e.to_string())?;
    admins
        .insert_one(&admin, None)
        .await
        .map_err(|e| e.to_string())?;
    info!("✓ Bootstrap super admin created ({})", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::error::{Error, WriteError};

    fn unique_index_violation() -> Error {
        let write_error: WriteError = mongodb::bson::from_document(doc! {
            "code": 11000,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: talentgate.coupons index: code_1",
            "message": "E11000 duplicate key error collection: talentgate.coupons index: code_1",
        })
        .unwrap();
        Error::from(ErrorKind::Write(WriteFailure::WriteError(write_error)))
    }

    #[test]
    fn unique_index_violations_are_detected() {
        assert!(is_duplicate_key(&unique_index_violation()));
    }

    #[test]
    fn unrelated_errors_are_not_duplicate_keys() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        assert!(!is_duplicate_key(&err));
    }
}
