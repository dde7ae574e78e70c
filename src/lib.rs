//! Concurrent processing pipelines
//!
//! A pipeline takes batches of messages from an inbound channel, runs each
//! batch through an ordered chain of processors and hands the surviving
//! batches to an outbound channel. With more than one thread configured the
//! chain is replicated into independent lanes that share the inbound stream.
//!
//! ```rust,ignore
//! use lanes::prelude::*;
//!
//! let config = Config::from_json_str(r#"{"threads": 4, "processors": [{"type": "uppercase"}]}"#)?;
//! let mut pipeline = build_pipeline(&config, &Registry::with_builtins())?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! let mut results = pipeline.consume(rx)?;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod io;
pub mod pipeline;
pub mod prelude;
pub mod processor;
