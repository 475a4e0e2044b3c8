pub mod access_level;
pub mod approver_grant;
pub mod functional_level;

pub use access_level::{AccessLevelDefinition, ApiAccessCategory};
pub use approver_grant::{ApprovalDecision, ApprovalStatus, ApproverGrant, DecisionRecord};
pub use functional_level::{
    FunctionalLevel, LevelChanges, LevelDependents, LevelStatus, NewLevel, Reparent, ROOT_LEVEL_DESCRIPTION,
};

/// A text column held a value outside its enum
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}
