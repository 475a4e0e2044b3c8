pub mod access;
pub mod auth;
pub mod response;

pub use access::{validate_access, AccessGate};
pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
