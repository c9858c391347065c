pub mod pagination;
pub mod response;
pub mod validation;

pub use pagination::page_window;
pub use response::{ApiError, ApiResponse, Created};
pub use validation::*;
