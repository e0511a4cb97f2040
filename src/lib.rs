//! Todo list backend (actix-web over diesel/SQLite) and the optimistic
//! client cache that drives it.

pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod repository;
pub mod telemetry;
