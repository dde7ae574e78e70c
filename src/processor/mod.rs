pub mod builtin;
pub mod registry;
pub mod traits;

// Re-export commonly used types
pub use crate::domain::ProcessorError;
pub use registry::{Constructor, Registry};
pub use traits::{BuildContext, Processor, ProcessorFactory};
