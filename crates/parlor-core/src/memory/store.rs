//! In-process conversation memory.
//!
//! `ConversationMemoryStore` is a `DashMap` of per-conversation slots. Each
//! slot owns its own message log and its own turn gate, so work on one
//! conversation id never blocks another. Slots are created on first use via
//! `DashMap::entry`, which holds the shard lock while inserting and therefore
//! creates exactly one slot per id even under concurrent first turns.
//!
//! Never hold a `DashMap` guard across `.await`: slot handles are cloned out
//! as `Arc`s before any async work.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use parlor_types::conversation::ConversationId;
use parlor_types::llm::Message;

#[derive(Debug, Default)]
struct ConversationSlot {
    log: RwLock<Vec<Message>>,
    gate: Arc<Mutex<()>>,
}

impl ConversationSlot {
    // A poisoned log only means a panic happened mid-push on another thread;
    // the Vec itself is still structurally valid.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Message>> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Message>> {
        self.log.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ordered message logs keyed by conversation id.
///
/// Logs live for the process lifetime; nothing is evicted.
#[derive(Debug, Default)]
pub struct ConversationMemoryStore {
    conversations: DashMap<ConversationId, Arc<ConversationSlot>>,
}

impl ConversationMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message to the end of a conversation's log.
    pub fn append(&self, id: &ConversationId, message: Message) {
        let slot = self.slot(id);
        let mut log = slot.write();
        log.push(message);
        debug!(conversation_id = %id, len = log.len(), "appended message");
    }

    /// Append a completed user/assistant exchange under a single lock, so
    /// readers see both messages or neither.
    pub fn append_exchange(&self, id: &ConversationId, user: Message, assistant: Message) {
        let slot = self.slot(id);
        let mut log = slot.write();
        log.reserve(2);
        log.push(user);
        log.push(assistant);
        debug!(conversation_id = %id, len = log.len(), "recorded exchange");
    }

    /// The last `max_size` messages of the log, oldest first.
    ///
    /// Unknown ids yield an empty window. Read-only with respect to the log.
    pub fn recall(&self, id: &ConversationId, max_size: usize) -> RecallWindow {
        let slot = self.slot(id);
        let log = slot.read();
        let start = log.len().saturating_sub(max_size);
        RecallWindow {
            messages: log[start..].to_vec(),
        }
    }

    /// Wait for exclusive use of a conversation for one turn.
    ///
    /// Turns holding a permit for the same id run one after another, in the
    /// order they started waiting. Different ids never contend.
    pub async fn begin_turn(&self, id: &ConversationId) -> TurnPermit {
        let gate = self.slot(id).gate.clone();
        let guard = gate.lock_owned().await;
        TurnPermit {
            conversation_id: id.clone(),
            _guard: guard,
        }
    }

    /// Number of messages in a conversation's log.
    pub fn len(&self, id: &ConversationId) -> usize {
        self.conversations
            .get(id)
            .map(|slot| slot.read().len())
            .unwrap_or(0)
    }

    /// Number of conversations that have a log.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Empty a conversation's log. Returns how many messages were dropped.
    ///
    /// The slot (and its turn gate) stays in place so turns that are already
    /// waiting on it remain serialized.
    pub fn clear(&self, id: &ConversationId) -> usize {
        match self.conversations.get(id).map(|slot| slot.clone()) {
            Some(slot) => {
                let mut log = slot.write();
                let dropped = log.len();
                log.clear();
                debug!(conversation_id = %id, dropped, "cleared conversation");
                dropped
            }
            None => 0,
        }
    }

    fn slot(&self, id: &ConversationId) -> Arc<ConversationSlot> {
        if let Some(slot) = self.conversations.get(id) {
            return slot.clone();
        }
        self.conversations
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(conversation_id = %id, "created conversation log");
                Arc::new(ConversationSlot::default())
            })
            .clone()
    }
}

/// Read-only snapshot of the tail of a conversation log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallWindow {
    messages: Vec<Message>,
}

impl RecallWindow {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl IntoIterator for RecallWindow {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Exclusive hold on one conversation for the duration of a turn.
///
/// Released on drop, including when the owning future is cancelled.
#[derive(Debug)]
pub struct TurnPermit {
    conversation_id: ConversationId,
    _guard: OwnedMutexGuard<()>,
}

impl TurnPermit {
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    #[test]
    fn recall_unknown_id_is_empty() {
        let store = ConversationMemoryStore::new();
        let window = store.recall(&id("nobody"), 10);
        assert!(window.is_empty());
    }

    #[test]
    fn recall_returns_bounded_suffix_in_order() {
        let store = ConversationMemoryStore::new();
        let c = id("u1");
        for i in 0..5 {
            store.append(&c, Message::user(format!("m{i}")));
        }

        let window = store.recall(&c, 3);
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);

        assert_eq!(store.recall(&c, 50).len(), 5);
        assert!(store.recall(&c, 0).is_empty());
    }

    #[test]
    fn recall_is_idempotent() {
        let store = ConversationMemoryStore::new();
        let c = id("u1");
        store.append_exchange(&c, Message::user("hi"), Message::assistant("hello"));
        assert_eq!(store.recall(&c, 10), store.recall(&c, 10));
        assert_eq!(store.len(&c), 2);
    }

    #[test]
    fn conversations_are_isolated() {
        let store = ConversationMemoryStore::new();
        store.append(&id("a"), Message::user("for a"));
        store.append(&id("b"), Message::user("for b"));

        assert_eq!(store.recall(&id("a"), 10).messages()[0].content, "for a");
        assert_eq!(store.recall(&id("b"), 10).messages()[0].content, "for b");
        assert_eq!(store.conversation_count(), 2);
    }

    #[test]
    fn clear_empties_log_but_keeps_slot() {
        let store = ConversationMemoryStore::new();
        let c = id("u1");
        store.append_exchange(&c, Message::user("q"), Message::assistant("a"));
        assert_eq!(store.clear(&c), 2);
        assert_eq!(store.len(&c), 0);
        assert_eq!(store.conversation_count(), 1);
        assert_eq!(store.clear(&id("missing")), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_creates_one_log() {
        let store = Arc::new(ConversationMemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(&id("shared"), Message::user(format!("m{i}")));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.conversation_count(), 1);
        assert_eq!(store.len(&id("shared")), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_id_turns_serialize() {
        let store = Arc::new(ConversationMemoryStore::new());
        let c = id("u1");

        let first = store.begin_turn(&c).await;
        let waiter = {
            let store = store.clone();
            let c = c.clone();
            tokio::spawn(async move {
                let _permit = store.begin_turn(&c).await;
                store.recall(&c, 10).len()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        store.append_exchange(&c, Message::user("q"), Message::assistant("a"));
        drop(first);

        // The second turn recalls only after the first one's append.
        assert_eq!(waiter.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn different_ids_do_not_contend() {
        let store = ConversationMemoryStore::new();
        let _a = store.begin_turn(&id("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), store.begin_turn(&id("b"))).await;
        assert!(b.is_ok());
        assert_eq!(b.unwrap().conversation_id().as_str(), "b");
    }
}
