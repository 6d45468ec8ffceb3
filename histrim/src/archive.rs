//! Archive sink for evicted messages.
//!
//! The engine never archives on its own: a host takes `CompactionOutcome::evicted` and
//! hands it to an [`Archive`] so dropped content stays available to a long-term store.

use std::sync::Mutex;

use crate::message::Message;

/// Error from [`Archive`] operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("archive io: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Other(String),
}

/// Sink for messages evicted by compaction.
pub trait Archive: Send + Sync {
    fn archive(&self, messages: &[Message]) -> Result<(), ArchiveError>;
}

/// No-op implementation: evicted messages are dropped.
#[derive(Debug, Default)]
pub struct NoOpArchive;

impl Archive for NoOpArchive {
    fn archive(&self, _messages: &[Message]) -> Result<(), ArchiveError> {
        Ok(())
    }
}

/// Keeps archived messages in memory, in the order received. Not persistent.
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything archived so far.
    pub fn messages(&self) -> Result<Vec<Message>, ArchiveError> {
        let guard = self
            .messages
            .lock()
            .map_err(|e| ArchiveError::Other(e.to_string()))?;
        Ok(guard.clone())
    }
}

impl Archive for InMemoryArchive {
    fn archive(&self, messages: &[Message]) -> Result<(), ArchiveError> {
        let mut guard = self
            .messages
            .lock()
            .map_err(|e| ArchiveError::Other(e.to_string()))?;
        guard.extend_from_slice(messages);
        Ok(())
    }
}
