//! The backing store: directory reads, message reads and writes, and the
//! change feed conversations subscribe to.

mod seed;
mod sqlite;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::{RecvError, TryRecvError}};
use tracing::warn;

use crate::{
    db::{AccountRow, MessageRow, PresenceRow},
    error::{ChatError, ChatResult},
    model::ConversationKey,
};

pub use seed::{Seed, SeedAccount, SeedPresence};
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change on the messages table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChange {
    pub kind: ChangeKind,
    pub sender_id: String,
    pub receiver_id: String,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// All accounts, ordered by name.
    async fn list_accounts(&self) -> ChatResult<Vec<AccountRow>>;

    async fn list_presence(&self) -> ChatResult<Vec<PresenceRow>>;

    /// Every message between the two participants, oldest first.
    async fn fetch_conversation(&self, key: &ConversationKey) -> ChatResult<Vec<MessageRow>>;

    /// Stores a message with a fresh id and timestamp and returns it.
    async fn insert_message(&self, message: NewMessage) -> ChatResult<MessageRow>;

    /// Registers interest in changes to one conversation. Dropping the
    /// returned handle releases it.
    fn subscribe(&self, key: &ConversationKey) -> Subscription;
}

/// A live change subscription filtered to one conversation.
#[derive(Debug)]
pub struct Subscription {
    key: ConversationKey,
    rx: broadcast::Receiver<MessageChange>,
}

impl Subscription {
    pub fn new(key: ConversationKey, rx: broadcast::Receiver<MessageChange>) -> Self {
        Self { key, rx }
    }

    /// Waits until something in this conversation changes. A lagging
    /// receiver has lost events, which counts as a change.
    pub async fn changed(&mut self) -> ChatResult<()> {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.key.contains(&change.sender_id, &change.receiver_id) => {
                    return Ok(())
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change feed lagged");
                    return Ok(());
                }
                Err(RecvError::Closed) => return Err(ChatError::Closed),
            }
        }
    }

    /// Discards changes that are already queued. Returns whether any of
    /// them touched this conversation.
    pub fn drain(&mut self) -> bool {
        let mut relevant = false;
        loop {
            match self.rx.try_recv() {
                Ok(change) => {
                    relevant |= self.key.contains(&change.sender_id, &change.receiver_id)
                }
                Err(TryRecvError::Lagged(_)) => relevant = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return relevant,
            }
        }
    }
}
