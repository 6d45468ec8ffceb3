//! Compaction configuration for history pruning and compression.
//!
//! Passed explicitly into every engine call; there is no process-wide configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When the compression pass runs relative to pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionOrder {
    /// Compress only messages selected from the remainder, after pruning.
    #[default]
    AfterPruning,
    /// Compress non-essential messages outside the recent window, then prune.
    BeforePruning,
    /// Never compress.
    Disabled,
}

impl CompressionOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "after_pruning" | "after" => Some(Self::AfterPruning),
            "before_pruning" | "before" => Some(Self::BeforePruning),
            "disabled" | "off" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// How the protected sets (essential, recent) reserve budget before remainder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetReservation {
    /// `max(essential_tokens, recent_tokens)`.
    #[default]
    Max,
    /// Tokens of `essential ∪ recent`, counting overlapping messages once.
    Union,
    /// `essential_tokens + recent_tokens`, counting overlapping messages twice.
    Additive,
}

impl BudgetReservation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Some(Self::Max),
            "union" => Some(Self::Union),
            "additive" | "sum" => Some(Self::Additive),
            _ => None,
        }
    }
}

/// Configuration for compaction: pruning target, recency window, compression knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Fraction of current tokens to remove, in [0, 1).
    pub target_reduction_ratio: f64,
    /// The most recent N messages always survive compaction.
    pub minimum_messages: usize,
    /// Only messages longer than this many characters are compressed.
    pub compression_length_threshold: usize,
    /// Only messages scoring below this are compressed.
    pub compression_importance_cutoff: f64,
    /// Fraction of words kept by compression, in (0, 1].
    pub compression_keep_fraction: f64,
    /// Minimum token reduction a compression must achieve, in [0, 1).
    pub minimum_compression_ratio: f64,
    pub compression_order: CompressionOrder,
    pub budget_reservation: BudgetReservation,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            target_reduction_ratio: 0.20,
            minimum_messages: 15,
            compression_length_threshold: 200,
            compression_importance_cutoff: 0.7,
            compression_keep_fraction: 0.35,
            minimum_compression_ratio: 0.6,
            compression_order: CompressionOrder::AfterPruning,
            budget_reservation: BudgetReservation::Max,
        }
    }
}

impl CompactionConfig {
    /// Checks every range constraint; the first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_messages == 0 {
            return Err(ConfigError::MinimumMessages(self.minimum_messages));
        }
        let keep = self.compression_keep_fraction;
        if !(keep > 0.0 && keep <= 1.0) {
            return Err(ConfigError::KeepFraction(keep));
        }
        let ratio = self.target_reduction_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return Err(ConfigError::ReductionRatio(ratio));
        }
        let min_ratio = self.minimum_compression_ratio;
        if !(0.0..1.0).contains(&min_ratio) {
            return Err(ConfigError::CompressionRatio(min_ratio));
        }
        Ok(())
    }

    /// Returns `self` if valid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Token target for a history currently at `current_tokens`: `floor(current * (1 - ratio))`.
    pub fn target_tokens(&self, current_tokens: usize) -> usize {
        (current_tokens as f64 * (1.0 - self.target_reduction_ratio)).floor() as usize
    }
}
