// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth, plus validate_access on mutating routes)
pub mod protected;
pub mod public;
