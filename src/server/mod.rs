//! HTTP surface for workflow submission, progress, and results.

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::router;
