// handlers/mod.rs - two security tiers
//
// Public (no auth)    → account creation and token acquisition
// Protected (JWT)     → everything under /api scoped to the token's user

pub mod protected;
pub mod public;
