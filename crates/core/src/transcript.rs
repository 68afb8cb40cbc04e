//! Bounded, in-memory chat transcript.

use crate::message::{Message, Role};
use std::collections::VecDeque;

/// An ordered log of messages that keeps only the most recent `limit` entries.
///
/// Evicted entries are discarded; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: VecDeque<Message>,
    limit: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TRANSCRIPT_LIMIT)
    }
}

impl Transcript {
    /// Creates an empty transcript retaining at most `limit` messages.
    pub fn new(limit: usize) -> Self {
        Self {
            // The limit may be far larger than any real conversation.
            messages: VecDeque::with_capacity(
                limit.min(crate::DEFAULT_TRANSCRIPT_LIMIT).saturating_add(2),
            ),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message to the end. The bound is not enforced until
    /// [`Transcript::evict_overflow`] runs.
    pub fn append(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Drops messages from the front until the length is within the limit.
    ///
    /// A bot reply left at the front after eviction lost its user message and
    /// is dropped too, so an odd limit never splits an exchange.
    pub fn evict_overflow(&mut self) {
        let mut evicted = false;
        while self.messages.len() > self.limit {
            self.messages.pop_front();
            evicted = true;
        }
        if evicted && self.messages.front().is_some_and(|m| m.role == Role::Bot) {
            self.messages.pop_front();
        }
    }

    /// Appends a user/bot exchange and restores the length bound.
    pub fn record_exchange(&mut self, user: Message, bot: Message) {
        self.append(user);
        self.append(bot);
        self.evict_overflow();
    }

    /// Snapshot of all retained messages in insertion order.
    pub fn all(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}
