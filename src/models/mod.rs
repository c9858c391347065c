pub mod principal;
pub mod user;
pub mod plan;
pub mod coupon;
pub mod payment;
pub mod commission;
pub mod subscription;

pub use principal::*;
pub use user::*;
pub use plan::*;
pub use coupon::*;
pub use payment::*;
pub use commission::*;
pub use subscription::*;
