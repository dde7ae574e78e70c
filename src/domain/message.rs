use std::collections::BTreeMap;

use super::ack::{AckHandle, AckReceiver, Outcome};
use super::error::ProcessorError;

/// A single message flowing through the pipeline
///
/// The acknowledgment handle is owned by whoever produced the message;
/// cloning a message clones the reference, never the slot.
#[derive(Debug, Clone)]
pub struct Message {
    payload: Vec<u8>,
    metadata: BTreeMap<String, String>,
    error: Option<ProcessorError>,
    ack: AckHandle,
}

impl Message {
    /// Create a message without an outcome listener
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self::with_handle(payload, AckHandle::detached())
    }

    /// Create a message and the receiver its outcome is reported to
    pub fn with_ack(payload: impl Into<Vec<u8>>) -> (Self, AckReceiver) {
        let (handle, rx) = AckHandle::pair();
        (Self::with_handle(payload, handle), rx)
    }

    /// Create a message attached to an existing acknowledgment handle
    pub fn with_handle(payload: impl Into<Vec<u8>>, ack: AckHandle) -> Self {
        Self {
            payload: payload.into(),
            metadata: BTreeMap::new(),
            error: None,
            ack,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Get a metadata value
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Set a metadata value, replacing any previous one
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Flag this message as errored
    ///
    /// A flagged message is pulled out of its batch once the current
    /// processor returns and never reaches later processors.
    pub fn fail(&mut self, error: ProcessorError) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&ProcessorError> {
        self.error.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn take_error(&mut self) -> Option<ProcessorError> {
        self.error.take()
    }

    pub fn ack_handle(&self) -> &AckHandle {
        &self.ack
    }

    /// Acknowledge successful delivery
    pub fn ack(&self) -> bool {
        self.ack.resolve(Outcome::Delivered)
    }

    /// Report a non-success outcome for this message
    pub fn reject(&self, outcome: Outcome) -> bool {
        self.ack.resolve(outcome)
    }
}
