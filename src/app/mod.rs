pub mod cli;
pub mod error;

// Re-export commonly used types
pub use cli::{CliApp, DEFAULT_LOG_FILTER};
pub use error::AppError;
