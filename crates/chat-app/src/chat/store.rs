use std::sync::Arc;

use murmur_llm::ProviderMessage;
use tokio::sync::watch;

use super::message::Message;

/// Immutable view of the conversation handed to observers.
pub type Snapshot = Arc<[Message]>;

/// Ordered message log that is the single source of truth for display.
///
/// Appends never reorder; the only removal is the loading placeholder. Every
/// mutation publishes a fresh [`Snapshot`] to subscribers.
pub struct ConversationStore {
    messages: Vec<Message>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl ConversationStore {
    pub fn new(seed: Message) -> Self {
        let messages = vec![seed];
        let (snapshot_tx, _) = watch::channel(Snapshot::from(messages.clone()));
        Self {
            messages,
            snapshot_tx,
        }
    }

    /// Returns a receiver that already holds the current content.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.send_replace(self.snapshot());
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self.messages.clone())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn loading_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_loading())
            .count()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.publish();
    }

    /// Removes the loading placeholder if one exists; otherwise a no-op.
    pub fn remove_loading_placeholder(&mut self) -> Option<Message> {
        let index = self.messages.iter().position(Message::is_loading)?;
        let removed = self.messages.remove(index);
        self.publish();
        Some(removed)
    }

    pub fn reset(&mut self, seed: Message) {
        self.messages.clear();
        self.messages.push(seed);
        self.publish();
    }

    /// Conversation as sent to the provider, placeholders excluded.
    pub fn history(&self) -> Vec<ProviderMessage> {
        self.messages
            .iter()
            .filter(|message| !message.is_loading())
            .map(Message::to_provider_message)
            .collect()
    }

    fn publish(&self) {
        // Snapshots are only materialized when someone is watching.
        if self.snapshot_tx.receiver_count() > 0 {
            self.snapshot_tx.send_replace(self.snapshot());
        }
    }
}
