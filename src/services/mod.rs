pub mod access_service;
pub mod approval_service;
pub mod level_service;

pub use access_service::{AccessError, AccessService};
pub use approval_service::{ApprovalError, ApprovalService, AuthorizationCheck};
pub use level_service::{LevelError, LevelService};
