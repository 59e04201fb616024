//! Headless racing control backend.
//!
//! Input clients (webcam tracker, phone tilt) stream steering samples over a
//! WebSocket; the [`fusion`] core merges them into one smoothed value in
//! [-1.0, 1.0] that game clients and status endpoints read back.

pub mod api;
pub mod connection;
pub mod core;
pub mod error;
pub mod fusion;
pub mod ingest;

pub use error::{ConfigError, IngestError};
