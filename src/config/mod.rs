pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use error::ConfigError;
pub use pipeline::{Config, ProcessorConfig};
