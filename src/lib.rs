// Content Interaction Service - cached posts, comment threads and notification fan-out

// Application wiring
pub mod app_state;
pub mod config;

// HTTP surface
pub mod http;

// Infrastructure - primary store, cache backends, social graph client
pub mod infrastructure;

// Domain entities
pub mod models;

// Domain services and the interaction facade
pub mod services;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
