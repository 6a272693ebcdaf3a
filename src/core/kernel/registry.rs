use crate::core::errors::ExchangeError;
use crate::core::kernel::connection::Connection;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry {
    pub topic: String,
    /// Last subscribe frame sent for this topic
    pub payload: Message,
}

/// Subscribe payloads remembered for replay, in registration order
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<SubscriptionEntry>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `payload` for `topic`
    ///
    /// Resubscribing overwrites the payload but keeps the original position.
    pub fn upsert(&mut self, topic: &str, payload: Message) {
        match self.entries.iter_mut().find(|e| e.topic == topic) {
            Some(entry) => entry.payload = payload,
            None => self.entries.push(SubscriptionEntry {
                topic: topic.to_string(),
                payload,
            }),
        }
    }

    pub fn remove(&mut self, topic: &str) -> Option<SubscriptionEntry> {
        let index = self.entries.iter().position(|e| e.topic == topic)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.entries.iter().any(|e| e.topic == topic)
    }

    pub fn topics(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.topic.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Send every payload once, in registration order
    ///
    /// Stops at the first failed write; the caller treats that as a broken
    /// connection and replays everything again on the next one.
    pub async fn replay(&self, connection: &Connection) -> Result<(), ExchangeError> {
        for entry in &self.entries {
            connection.write(entry.payload.clone()).await?;
            debug!(topic = %entry.topic, "resubscribed");
        }
        Ok(())
    }
}
