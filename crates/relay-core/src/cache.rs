//! Bounded FIFO of recently relayed messages.
//!
//! New browser sessions are backfilled from this buffer. Insertion order is
//! preserved and the buffer never holds more than its capacity: pushing onto
//! a full buffer evicts exactly the oldest entry.

use std::collections::VecDeque;

use crate::message::CachedMessage;

/// Number of messages kept for backfill.
pub const MAX_CACHE_SIZE: usize = 100;

/// Ordered, capacity-bounded message buffer.
#[derive(Clone, Debug)]
pub struct MessageBuffer {
    messages: VecDeque<CachedMessage>,
    capacity: usize,
}

impl MessageBuffer {
    /// Create an empty buffer holding up to [`MAX_CACHE_SIZE`] messages.
    pub fn new() -> Self {
        Self::with_capacity(MAX_CACHE_SIZE)
    }

    /// Create an empty buffer with a custom capacity (clamped to at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, returning the evicted oldest entry if the buffer
    /// was already full.
    pub fn push(&mut self, message: CachedMessage) -> Option<CachedMessage> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<CachedMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CachedMessage> {
        self.messages.iter()
    }

    /// Number of cached messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Maximum number of messages held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}
