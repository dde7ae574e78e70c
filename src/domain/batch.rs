use super::ack::Outcome;
use super::error::ProcessorError;
use super::message::Message;

/// Ordered group of messages processed together through one chain call
#[derive(Debug, Clone, Default)]
pub struct Batch {
    messages: Vec<Message>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch of detached messages from raw payloads
    pub fn from_payloads<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        payloads.into_iter().map(Message::new).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Message> {
        self.messages.iter_mut()
    }

    /// Keep only the messages matching the predicate, in order
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Message) -> bool,
    {
        self.messages.retain(f);
    }

    /// Split off the messages flagged with an error, preserving order of both halves
    pub fn take_failed(&mut self) -> Vec<Message> {
        let (failed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.messages)
            .into_iter()
            .partition(Message::is_failed);
        self.messages = kept;
        failed
    }

    /// Acknowledge every message as delivered
    pub fn ack(&self) {
        for message in &self.messages {
            message.ack();
        }
    }

    /// Report every message as failed with the same cause
    pub fn fail_all(&self, error: &ProcessorError) {
        self.resolve_all(Outcome::Failed(error.clone()));
    }

    /// Report the same outcome for every message
    pub fn resolve_all(&self, outcome: Outcome) {
        for message in &self.messages {
            message.reject(outcome.clone());
        }
    }

    /// Payloads as lossy UTF-8 strings, mostly useful in tests and logs
    pub fn payload_strings(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| String::from_utf8_lossy(m.payload()).into_owned())
            .collect()
    }
}

impl From<Vec<Message>> for Batch {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl FromIterator<Message> for Batch {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
