pub mod ack;
pub mod batch;
pub mod error;
pub mod message;

// Re-export commonly used types
pub use ack::{AckHandle, AckReceiver, Outcome};
pub use batch::Batch;
pub use error::ProcessorError;
pub use message::Message;
