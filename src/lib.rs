pub mod models;
pub mod views;
pub mod controllers;
pub mod cli;
pub mod error;
pub mod telemetry;

// Re-exports for convenience
pub use models::{Config, FeedStore, Post};
pub use controllers::{start_app, init_feed};
pub use error::CasefeedError;
