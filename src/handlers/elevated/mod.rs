// handlers/elevated/mod.rs - Admin-only handlers

pub mod users;
