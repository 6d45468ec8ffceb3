//! Ordered message storage for one session.
//!
//! Appends assign the next `original_index`; a consecutive assistant turn is merged into
//! the previous assistant message instead of becoming a new entry. The whole sequence is
//! swapped at once by [`HistoryStore::replace`] after a compaction.

use std::sync::Arc;

use crate::compress::MessageAnalyzer;
use crate::error::HistoryError;
use crate::message::{Message, NewMessage, Role};

/// Counts from one [`HistoryStore::append`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendSummary {
    /// New entries created.
    pub appended: usize,
    /// Items merged into the previous assistant message.
    pub merged: usize,
}

impl AppendSummary {
    pub fn accepted(&self) -> usize {
        self.appended + self.merged
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    analyzer: Arc<MessageAnalyzer>,
    messages: Vec<Message>,
    next_index: u64,
}

impl HistoryStore {
    pub fn new(analyzer: Arc<MessageAnalyzer>) -> Self {
        Self {
            analyzer,
            messages: Vec::new(),
            next_index: 0,
        }
    }

    pub fn analyzer(&self) -> &MessageAnalyzer {
        &self.analyzer
    }

    /// Appends items in order, merging consecutive assistant turns.
    pub fn append<I>(&mut self, items: I) -> AppendSummary
    where
        I: IntoIterator<Item = NewMessage>,
    {
        let mut summary = AppendSummary::default();
        for item in items {
            if self.append_one(item) {
                summary.merged += 1;
            } else {
                summary.appended += 1;
            }
        }
        summary
    }

    /// Appends one item; returns true when it was merged into the previous message.
    pub fn append_one(&mut self, item: NewMessage) -> bool {
        if item.role == Role::Assistant {
            if let Some(last) = self.messages.last_mut() {
                if last.role == Role::Assistant {
                    last.content.push_str(&item.content);
                    self.analyzer.refresh(last);
                    tracing::debug!(index = last.original_index, "merged assistant turn");
                    return true;
                }
            }
        }
        let index = self.next_index;
        self.next_index += 1;
        let message = self
            .analyzer
            .build(index, item.role, item.content, item.timestamp);
        self.messages.push(message);
        false
    }

    /// Read-only view of the current sequence.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Swaps in a new sequence.
    ///
    /// Indices must be strictly increasing and previously issued by this store; on error
    /// the current contents are left untouched.
    pub fn replace(&mut self, messages: Vec<Message>) -> Result<(), HistoryError> {
        let mut previous: Option<u64> = None;
        for (position, m) in messages.iter().enumerate() {
            if m.original_index >= self.next_index {
                return Err(HistoryError::UnknownIndex(m.original_index));
            }
            if let Some(prev) = previous {
                if m.original_index <= prev {
                    return Err(HistoryError::OutOfOrder {
                        position,
                        previous: prev,
                        index: m.original_index,
                    });
                }
            }
            previous = Some(m.original_index);
        }
        self.messages = messages;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index the next appended message will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn total_tokens(&self) -> usize {
        self.analyzer.tokens(&self.messages)
    }
}
