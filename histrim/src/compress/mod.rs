//! History compaction: token estimation, classification, scoring, pruning and compression.
//!
//! - [`tokens`]: [`Tokenizer`] seam and [`HeuristicTokenizer`].
//! - [`essential`]: [`EssentialClassifier`], messages that are never evicted.
//! - [`importance`]: [`ImportanceScorer`] and [`ImportanceLevel`].
//! - [`prune`]: [`PruningEngine`], budget-constrained selection.
//! - [`compression`]: [`CompressionEngine`], shortens verbose low-importance messages.

pub mod analyzer;
pub mod compression;
pub mod config;
pub mod essential;
pub mod importance;
pub mod prune;
pub mod tokens;

pub use analyzer::MessageAnalyzer;
pub use compression::{compression_ratio, CompressionEngine, COMPRESSION_MARKER};
pub use config::{BudgetReservation, CompactionConfig, CompressionOrder};
pub use essential::{EssentialClassifier, DEFAULT_ESSENTIAL_KEYWORDS};
pub use importance::{
    ImportanceLevel, ImportanceScorer, ImportanceThresholds, MarkerRule, ScoringWeights,
};
pub use prune::{keep_last, BudgetStatus, CompactionOutcome, PruningEngine};
pub use tokens::{HeuristicTokenizer, Tokenizer, DEFAULT_CHARS_PER_TOKEN};
