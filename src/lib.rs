/// Tracks, seeds and fingerprint matches
pub mod data;

/// Configuration file and environment handling
pub mod config;

/// Service clients and text helpers
pub mod helpers;

/// Cascading recommendation engine
pub mod recommendations;

/// API server for REST endpoints
pub mod api;

/// Logging configuration and utilities
pub mod logging;

pub use crate::config::AppConfig;
pub use crate::data::{Seed, Track};
pub use crate::recommendations::{CascadeResult, MetadataService, RecommendationCascade};
