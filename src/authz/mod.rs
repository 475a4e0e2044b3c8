//! Approval authorization and access-level permissions.
//!
//! Two independent gates live here. [`AccessMatrix`] answers whether a user's
//! numeric access level may call an API at all; [`ApprovalAuthorizer`] decides
//! whether a user may approve a specific project, level or requirement, walking
//! the functional level tree through [`LevelHierarchy`].

pub mod access;
pub mod approval;
pub mod error;
pub mod hierarchy;
pub mod scope;
pub mod store;

pub use access::{api_names, AccessDecision, AccessLevel, AccessMatrix, PermissionVector};
pub use approval::ApprovalAuthorizer;
pub use error::AuthzError;
pub use hierarchy::{HierarchyPath, LevelHierarchy, PathEnd};
pub use scope::AuthScope;
pub use store::{AccessMatrixStore, GrantStore, LevelStore, Store};
