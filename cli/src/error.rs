//! CLI error type: wraps every boundary the binary crosses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid session record: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("load config: {0}")]
    Load(#[from] config::LoadError),
    #[error("config: {0}")]
    Config(#[from] histrim::ConfigError),
    #[error("invalid {key}: {value:?}")]
    InvalidOption { key: &'static str, value: String },
    #[error(transparent)]
    Input(#[from] histrim::RecordError),
    #[error(transparent)]
    Compaction(#[from] histrim::CompactionError),
    #[error(transparent)]
    Archive(#[from] histrim::ArchiveError),
}
