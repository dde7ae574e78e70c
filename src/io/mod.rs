pub mod batch_writer;
pub mod error;
pub mod line_reader;

// Re-export commonly used types
pub use batch_writer::{drain_outbound, write_batch};
pub use error::IoError;
pub use line_reader::{DEFAULT_MAX_BATCH, DEFAULT_MAX_LINE_LENGTH, LineBatchStream, feed};
