pub mod auth;
pub mod admin;

pub use auth::AuthGuard;
pub use admin::{AdminGuard, SuperAdminGuard};
