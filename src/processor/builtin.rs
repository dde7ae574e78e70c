use std::time::Duration;

use async_trait::async_trait;
use tracing::{Span, debug};

use super::traits::{BuildContext, Processor};
use crate::config::ProcessorConfig;
use crate::domain::{Batch, ProcessorError};

/// Passes batches through untouched
pub struct Noop;

impl Noop {
    pub fn build(
        _config: &ProcessorConfig,
        _ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        Ok(Box::new(Noop))
    }
}

#[async_trait]
impl Processor for Noop {
    fn name(&self) -> &str {
        "noop"
    }

    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        Ok(vec![batch])
    }
}

/// Converts ASCII payload bytes to upper case
pub struct Uppercase;

impl Uppercase {
    pub fn build(
        _config: &ProcessorConfig,
        _ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        Ok(Box::new(Uppercase))
    }
}

#[async_trait]
impl Processor for Uppercase {
    fn name(&self) -> &str {
        "uppercase"
    }

    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        for msg in batch.iter_mut() {
            let upper = msg.payload().to_ascii_uppercase();
            msg.set_payload(upper);
        }
        Ok(vec![batch])
    }
}

/// Drops messages whose payload contains a pattern
pub struct Filter {
    pattern: Vec<u8>,
    span: Span,
}

impl Filter {
    pub fn build(
        config: &ProcessorConfig,
        ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        let pattern = config.required_str("contains")?;
        if pattern.is_empty() {
            return Err(ProcessorError::invalid_config("contains", "must not be empty"));
        }

        Ok(Box::new(Filter {
            pattern: pattern.as_bytes().to_vec(),
            span: ctx.span().clone(),
        }))
    }

    fn matches(&self, payload: &[u8]) -> bool {
        payload
            .windows(self.pattern.len())
            .any(|window| window == self.pattern.as_slice())
    }
}

#[async_trait]
impl Processor for Filter {
    fn name(&self) -> &str {
        "filter"
    }

    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        let before = batch.len();
        batch.retain(|msg| !self.matches(msg.payload()));

        let dropped = before - batch.len();
        if dropped > 0 {
            debug!(parent: &self.span, dropped, "Filtered messages");
        }

        Ok(vec![batch])
    }
}

/// Errors messages whose payload equals a given value
pub struct Reject {
    value: Vec<u8>,
    reason: String,
}

impl Reject {
    pub fn build(
        config: &ProcessorConfig,
        _ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        let value = config.required_str("value")?;
        let reason = config
            .str_option("reason")?
            .map(str::to_string)
            .unwrap_or_else(|| format!("payload matched '{value}'"));

        Ok(Box::new(Reject {
            value: value.as_bytes().to_vec(),
            reason,
        }))
    }
}

#[async_trait]
impl Processor for Reject {
    fn name(&self) -> &str {
        "reject"
    }

    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        for msg in batch.iter_mut() {
            if msg.payload() == self.value.as_slice() {
                msg.fail(ProcessorError::Rejected(self.reason.clone()));
            }
        }
        Ok(vec![batch])
    }
}

/// Breaks a batch into batches of at most `size` messages
pub struct Split {
    size: usize,
}

impl Split {
    pub fn build(
        config: &ProcessorConfig,
        _ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        let size = config.u64_option("size")?.unwrap_or(1);
        if size == 0 {
            return Err(ProcessorError::invalid_config("size", "must be at least 1"));
        }

        Ok(Box::new(Split {
            size: size as usize,
        }))
    }
}

#[async_trait]
impl Processor for Split {
    fn name(&self) -> &str {
        "split"
    }

    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        let mut batches = Vec::with_capacity(batch.len().div_ceil(self.size));
        let mut current = Batch::new();

        for msg in batch {
            current.push(msg);
            if current.len() == self.size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }

        Ok(batches)
    }
}

/// Waits a fixed duration before passing each batch on
pub struct Sleep {
    duration: Duration,
}

impl Sleep {
    pub fn build(
        config: &ProcessorConfig,
        _ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        let millis = config.u64_option("duration_ms")?.unwrap_or(0);
        Ok(Box::new(Sleep {
            duration: Duration::from_millis(millis),
        }))
    }
}

#[async_trait]
impl Processor for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }

    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        tokio::time::sleep(self.duration).await;
        Ok(vec![batch])
    }
}

/// Sets a metadata key on every message
pub struct SetMetadata {
    key: String,
    value: String,
}

impl SetMetadata {
    pub fn build(
        config: &ProcessorConfig,
        _ctx: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        Ok(Box::new(SetMetadata {
            key: config.required_str("key")?.to_string(),
            value: config.str_option("value")?.unwrap_or_default().to_string(),
        }))
    }
}

#[async_trait]
impl Processor for SetMetadata {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
        for msg in batch.iter_mut() {
            msg.set_meta(self.key.as_str(), self.value.as_str());
        }
        Ok(vec![batch])
    }
}
