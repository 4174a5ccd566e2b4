//! CLI command implementations.

pub mod check;
pub mod config;
pub mod operations;
pub mod roles;
pub mod version;
