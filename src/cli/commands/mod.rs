pub mod access;
pub mod authz;
pub mod token;
