// handlers/protected/mod.rs - Handlers behind jwt_auth_middleware
//
// Each handler receives the AuthUser extension and applies its own role and
// ownership checks.

pub mod auth;
pub mod bootcamps;
pub mod courses;
