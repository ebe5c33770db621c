// Social graph API - accounts, follows, posts, likes, comments, notifications and feed

// Core types and primitives
pub mod core;

// Storage, caching, auth and request plumbing
pub mod infrastructure;

// Domain records
pub mod models;

// Access control
pub mod privacy;

// Domain operations
pub mod services;

// HTTP surface
pub mod api;

pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use api::create_router;
pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, AppResult};
