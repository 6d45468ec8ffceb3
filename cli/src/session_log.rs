//! JSONL session log: one `{role, content, timestamp}` record per line.
//!
//! Reading is lenient about fields (a record missing `role` still parses, so the history can
//! report it) but strict about JSON: a malformed line fails the whole read with its line number.

use std::io::{BufRead, Write};

use chrono::{DateTime, Utc};
use histrim::{Message, RawItem, Role};
use serde::Serialize;

use crate::error::CliError;

/// Reads every non-blank line as a [`RawItem`].
pub fn read_items<R: BufRead>(reader: R) -> Result<Vec<RawItem>, CliError> {
    let mut items = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item: RawItem =
            serde_json::from_str(&line).map_err(|source| CliError::Record { line: i + 1, source })?;
        items.push(item);
    }
    tracing::debug!(items = items.len(), "session log read");
    Ok(items)
}

#[derive(Serialize)]
struct LogRecord<'a> {
    role: Role,
    content: &'a str,
    timestamp: DateTime<Utc>,
}

/// Writes messages in session log form; derived fields are not persisted.
pub fn write_messages<W: Write>(mut writer: W, messages: &[Message]) -> Result<(), CliError> {
    for m in messages {
        let record = LogRecord {
            role: m.role,
            content: &m.content,
            timestamp: m.timestamp,
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
