//! Fixed-capacity conversation store
//!
//! The store is a monitor: all state sits behind one mutex and every
//! operation takes it exactly once, so readers never observe a torn
//! sequence or a transient `size > capacity` during eviction.

use crate::{MemoryError, Message, MessageRecord, Result, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of messages retained per session
pub const DEFAULT_CAPACITY: usize = 10;

/// Snapshot of how full the store is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub current_messages: usize,
    pub max_messages: usize,
    pub remaining_capacity: usize,
}

#[derive(Debug, Default)]
struct Inner {
    messages: VecDeque<Message>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Next timestamp, never earlier than the previous one
    fn stamp(&mut self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        let ts = match self.last_timestamp {
            Some(last) if candidate < last => last,
            _ => candidate,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    /// Append one message, evicting the oldest when at `capacity`
    fn push(&mut self, capacity: usize, role: Role, content: &str) -> (Message, bool) {
        let timestamp = self.stamp(Utc::now());
        let message = Message::new(role, content, timestamp);

        let evicted = if self.messages.len() >= capacity {
            self.messages.pop_front().is_some()
        } else {
            false
        };
        self.messages.push_back(message.clone());
        (message, evicted)
    }
}

/// Ordered, bounded window of recent messages for one conversation
#[derive(Debug)]
pub struct ConversationStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ConversationStore {
    /// Create an empty store holding at most `capacity` messages
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MemoryError::InvalidCapacity);
        }
        Ok(Self {
            capacity,
            inner: Mutex::new(Inner {
                messages: VecDeque::with_capacity(capacity),
                last_timestamp: None,
            }),
        })
    }

    // Every mutation is all-or-nothing, so state behind a poisoned lock
    // is still consistent.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message, validating the role string.
    ///
    /// Fails with [`MemoryError::InvalidRole`] for anything other than
    /// `"user"` or `"assistant"`; the store is left untouched in that case.
    pub fn append(&self, role: &str, content: &str) -> Result<Message> {
        let role: Role = role.parse()?;
        Ok(self.push(role, content))
    }

    /// Append a message with an already-typed role.
    ///
    /// When the store is full the single oldest message is evicted first.
    pub fn push(&self, role: Role, content: &str) -> Message {
        let mut inner = self.lock();
        let (message, evicted) = inner.push(self.capacity, role, content);

        tracing::debug!(
            role = %role,
            size = inner.messages.len(),
            capacity = self.capacity,
            evicted,
            "Appended message to conversation memory"
        );
        message
    }

    /// Append a user message and the assistant reply under a single lock,
    /// so concurrent turns never interleave their halves.
    pub fn push_turn(&self, user: &str, assistant: &str) -> (Message, Message) {
        let mut inner = self.lock();
        let (question, first_evicted) = inner.push(self.capacity, Role::User, user);
        let (reply, second_evicted) = inner.push(self.capacity, Role::Assistant, assistant);

        tracing::debug!(
            size = inner.messages.len(),
            capacity = self.capacity,
            evicted = usize::from(first_evicted) + usize::from(second_evicted),
            "Appended turn to conversation memory"
        );
        (question, reply)
    }

    /// Remove every message. Capacity is unchanged; clearing an empty store is a no-op.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed = inner.messages.len();
        inner.messages.clear();
        tracing::debug!(removed, "Cleared conversation memory");
    }

    /// Number of stored messages
    pub fn size(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// Maximum number of messages, fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the stored messages in append order
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().messages.iter().cloned().collect()
    }

    /// The most recent `count` messages (all of them when `None`), oldest first
    pub fn recent(&self, count: Option<usize>) -> Vec<Message> {
        let inner = self.lock();
        let len = inner.messages.len();
        let skip = count.map_or(0, |n| len.saturating_sub(n));
        inner.messages.iter().skip(skip).cloned().collect()
    }

    /// Run `f` over the stored messages while holding the lock. `f` must not
    /// call back into the store.
    pub(crate) fn with_messages<R>(&self, f: impl FnOnce(&[Message]) -> R) -> R {
        let mut inner = self.lock();
        f(inner.messages.make_contiguous())
    }

    pub fn stats(&self) -> MemoryStats {
        let current = self.size();
        MemoryStats {
            current_messages: current,
            max_messages: self.capacity,
            remaining_capacity: self.capacity - current,
        }
    }

    /// Export the stored messages in a shape accepted by [`restore`](Self::restore)
    pub fn export(&self) -> Vec<MessageRecord> {
        self.lock().messages.iter().map(MessageRecord::from).collect()
    }

    /// Replace the contents with `records`, keeping only the newest `capacity` entries.
    ///
    /// Every record is validated before anything is replaced; a single bad
    /// entry fails the whole call with [`MemoryError::InvalidRestoreInput`]
    /// and leaves the previous contents in place.
    pub fn restore(&self, records: impl IntoIterator<Item = MessageRecord>) -> Result<()> {
        let mut validated = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            let role = record
                .role
                .ok_or_else(|| MemoryError::InvalidRestoreInput {
                    index,
                    reason: "missing role".to_string(),
                })?;
            let role = role
                .parse::<Role>()
                .map_err(|e| MemoryError::InvalidRestoreInput {
                    index,
                    reason: e.to_string(),
                })?;
            let content = record
                .content
                .ok_or_else(|| MemoryError::InvalidRestoreInput {
                    index,
                    reason: "missing content".to_string(),
                })?;
            validated.push((role, content, record.timestamp));
        }

        let dropped = validated.len().saturating_sub(self.capacity);

        let mut inner = self.lock();
        inner.messages.clear();
        inner.last_timestamp = None;
        let now = Utc::now();
        for (role, content, timestamp) in validated.into_iter().skip(dropped) {
            let ts = inner.stamp(timestamp.unwrap_or(now));
            inner.messages.push_back(Message::new(role, &content, ts));
        }

        tracing::debug!(
            restored = inner.messages.len(),
            dropped,
            "Restored conversation memory"
        );
        Ok(())
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            inner: Mutex::new(Inner::default()),
        }
    }
}
