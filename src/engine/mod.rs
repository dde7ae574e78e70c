pub mod executor;

// Re-export commonly used types
pub use executor::{ChainExecutor, ChainOutput};
