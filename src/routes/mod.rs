pub mod admin;
pub mod auth;
pub mod commission;
pub mod coupon;
pub mod payment;
pub mod plan;
pub mod subscription;
