pub mod gateway;
pub mod jwt;
pub mod settlement;

pub use gateway::PaymentGateway;
pub use jwt::JwtService;
