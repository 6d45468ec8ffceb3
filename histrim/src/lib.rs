//! # Histrim
//!
//! History compaction for long-running conversational sessions. A session's message
//! history grows without bound; histrim keeps it within a token budget while preserving
//! what matters.
//!
//! ## Design principles
//!
//! - **Protected sets**: essential messages (errors, critical notices, system/config lines)
//!   and the most recent `minimum_messages` are never evicted.
//! - **Greedy by importance**: everything else is ranked by a content heuristic and kept
//!   while it fits the budget left after the protected sets.
//! - **Order preserving**: every output is a subsequence of its input in `original_index`
//!   order; compressed messages keep their index.
//! - **Explicit config**: one [`CompactionConfig`] value, validated up front; no globals.
//!
//! ## Main modules
//!
//! - [`message`]: [`Message`], [`Role`], [`MessageKind`], [`RawItem`], [`NewMessage`].
//! - [`compress`]: [`Tokenizer`], [`EssentialClassifier`], [`ImportanceScorer`],
//!   [`PruningEngine`], [`CompressionEngine`], [`CompactionConfig`].
//! - [`history`]: [`HistoryStore`], index assignment and assistant merge.
//! - [`session`]: [`ConversationHistory`], the host-facing facade, and [`HistoryStats`].
//! - [`registry`]: [`SessionRegistry`], one history per session id.
//! - [`archive`]: [`Archive`] sink for evicted messages.
//!
//! ## Quick start
//!
//! ```
//! use histrim::{CompactionConfig, ConversationHistory, RawItem};
//!
//! let mut history = ConversationHistory::new(CompactionConfig::default()).unwrap();
//! history
//!     .record_items(vec![
//!         RawItem::new("user", "how do I implement the parser?"),
//!         RawItem::new("assistant", "Here is a sketch."),
//!     ])
//!     .unwrap();
//! let outcome = history.optimize_history(1_000).unwrap();
//! assert_eq!(outcome.messages.len(), 2);
//! ```

pub mod archive;
pub mod compress;
pub mod error;
pub mod history;
pub mod message;
pub mod registry;
pub mod session;

pub use archive::{Archive, ArchiveError, InMemoryArchive, NoOpArchive};
pub use compress::{
    compression_ratio, keep_last, BudgetReservation, BudgetStatus, CompactionConfig,
    CompactionOutcome, CompressionEngine, CompressionOrder, EssentialClassifier,
    HeuristicTokenizer, ImportanceLevel, ImportanceScorer, ImportanceThresholds, MarkerRule,
    MessageAnalyzer, PruningEngine, ScoringWeights, Tokenizer, COMPRESSION_MARKER,
    DEFAULT_CHARS_PER_TOKEN, DEFAULT_ESSENTIAL_KEYWORDS,
};
pub use error::{
    CompactionError, ConfigError, HistoryError, InvalidItem, RecordError, RejectedItem,
};
pub use history::{AppendSummary, HistoryStore};
pub use message::{Message, MessageKind, NewMessage, RawItem, Role};
pub use registry::SessionRegistry;
pub use session::{ConversationHistory, HistoryStats};
