//! Application configuration.
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `BULK_SENDER_*` environment variables.

pub mod models;

pub use models::*;

#[cfg(test)]
mod tests;
