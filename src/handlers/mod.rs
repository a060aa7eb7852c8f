// handlers/mod.rs - Handlers by security tier
//
// Public (no auth) → Protected (JWT auth, role checked per handler) → Elevated (admin only)

pub mod elevated;
pub mod protected;
pub mod public;
pub mod utils;
