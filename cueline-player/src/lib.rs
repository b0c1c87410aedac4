//! Cueline player library
//!
//! Playback controller for a linear playlist: a track list mirrored in an
//! in-memory cache and a SQLite store, a transport state machine, and a
//! background position clock, served over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod playlist;
pub mod store;

pub use error::{Error, Result};
