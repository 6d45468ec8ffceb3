//! Error types for configuration, history mutation and item recording.
//!
//! Estimation, scoring and classification never fail; errors only come from the
//! boundary (bad configuration, malformed items, an invalid replacement history).

use thiserror::Error;

/// Rejected [`CompactionConfig`](crate::CompactionConfig) value.
///
/// Returned by `CompactionConfig::validate` and by every engine entry point before any
/// work is done. Fatal to that call only.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("minimum_messages must be positive, got {0}")]
    MinimumMessages(usize),
    #[error("compression_keep_fraction must be in (0, 1], got {0}")]
    KeepFraction(f64),
    #[error("target_reduction_ratio must be in [0, 1), got {0}")]
    ReductionRatio(f64),
    #[error("minimum_compression_ratio must be in [0, 1), got {0}")]
    CompressionRatio(f64),
}

/// Why one item passed to `record_items` was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidItem {
    #[error("missing role")]
    MissingRole,
    #[error("missing content")]
    MissingContent,
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// An item rejected by `record_items`, with its position in the call's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    pub index: usize,
    pub reason: InvalidItem,
}

/// Error from `record_items`.
///
/// On `InvalidInput`, valid items in the same call were still appended; `appended` counts
/// them and `rejected` lists the failing input positions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("invalid input: {} item(s) rejected, {appended} appended", rejected.len())]
    InvalidInput {
        appended: usize,
        rejected: Vec<RejectedItem>,
    },
    /// Items were appended but compacting down to the token limit failed.
    #[error(transparent)]
    Compaction(#[from] CompactionError),
}

/// Error from `HistoryStore::replace`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history out of order at position {position}: index {index} after {previous}")]
    OutOfOrder {
        position: usize,
        previous: u64,
        index: u64,
    },
    #[error("index {0} was never issued by this history")]
    UnknownIndex(u64),
}

/// Error from a compaction run through `ConversationHistory`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompactionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: RecordError display names both counts.
    #[test]
    fn record_error_display_counts() {
        let err = RecordError::InvalidInput {
            appended: 2,
            rejected: vec![RejectedItem {
                index: 1,
                reason: InvalidItem::MissingRole,
            }],
        };
        let s = err.to_string();
        assert!(s.contains("1 item(s) rejected"), "{}", s);
        assert!(s.contains("2 appended"), "{}", s);
    }

    #[test]
    fn config_error_display_includes_value() {
        let s = ConfigError::KeepFraction(1.5).to_string();
        assert!(s.contains("compression_keep_fraction"), "{}", s);
        assert!(s.contains("1.5"), "{}", s);
    }
}
