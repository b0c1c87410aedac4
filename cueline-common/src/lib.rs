//! # Cueline Common Library
//!
//! Shared code for the Cueline playback service:
//! - Error type
//! - Bootstrap configuration (TOML + defaults)
//! - Event types broadcast by the player
//! - Database schema initialization and row models

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
