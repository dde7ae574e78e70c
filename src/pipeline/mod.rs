pub mod constructor;
pub mod error;
pub mod lane;
pub mod lifecycle;
pub mod pool;
pub mod single;
pub mod traits;

mod source;

// Re-export commonly used types
pub use constructor::{build_chain, build_pipeline};
pub use error::PipelineError;
pub use lane::{LaneReport, LaneState};
pub use lifecycle::PipelineState;
pub use pool::Pool;
pub use single::DirectPipeline;
pub use traits::Pipeline;
