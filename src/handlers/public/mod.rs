// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Reads of bootcamps and courses, plus token acquisition.

pub mod auth;
pub mod bootcamps;
pub mod courses;
