//! JSONL archive: evicted messages appended to a file, one full [`Message`] per line.

use std::io::Write;
use std::path::{Path, PathBuf};

use histrim::{Archive, ArchiveError, Message};

/// Appends archived messages (with index, score and flags) to a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlArchive {
    path: PathBuf,
}

impl JsonlArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Archive for JsonlArchive {
    fn archive(&self, messages: &[Message]) -> Result<(), ArchiveError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for m in messages {
            serde_json::to_writer(&mut buf, m)?;
            buf.push(b'\n');
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buf)?;
        tracing::info!(path = %self.path.display(), messages = messages.len(), "messages archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histrim::{CompactionConfig, ConversationHistory, RawItem};

    /// **Scenario**: two archive calls append; the file keeps indices in order.
    #[test]
    fn appends_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let archive = JsonlArchive::new(dir.path().join("archive.jsonl"));
        let mut history = ConversationHistory::new(CompactionConfig::default()).unwrap();
        history
            .record_items(vec![
                RawItem::new("user", "a"),
                RawItem::new("assistant", "b"),
                RawItem::new("user", "c"),
            ])
            .unwrap();
        let messages = history.items();
        archive.archive(&messages[..2]).unwrap();
        archive.archive(&messages[2..]).unwrap();
        archive.archive(&[]).unwrap();

        let text = std::fs::read_to_string(archive.path()).unwrap();
        let stored: Vec<Message> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(stored, messages);
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = JsonlArchive::new(dir.path().join("missing").join("archive.jsonl"));
        let history = {
            let mut h = ConversationHistory::new(CompactionConfig::default()).unwrap();
            h.record_items(vec![RawItem::new("user", "a")]).unwrap();
            h
        };
        let err = archive.archive(history.snapshot()).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
    }
}
