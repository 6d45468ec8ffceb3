//! Importance scoring: a [0, 1] relevance estimate used to rank non-protected messages.
//!
//! Score = base + marker bonuses - filler penalties, clipped to [0, 1]. Every weight,
//! phrase list and category threshold is a field so it can be calibrated per corpus.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// Coarse importance category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceLevel {
    High,
    Medium,
    Low,
}

/// Category cutoffs: `High` at or above `high`, `Medium` at or above `medium`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportanceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ImportanceThresholds {
    fn default() -> Self {
        Self {
            high: 0.6,
            medium: 0.35,
        }
    }
}

/// A group of phrases that adds `weight` once when any phrase occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRule {
    pub phrases: Vec<String>,
    pub weight: f64,
}

impl MarkerRule {
    pub fn new(phrases: &[&str], weight: f64) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            weight,
        }
    }

    fn matches(&self, lower: &str) -> bool {
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// Weights and phrase lists for [`ImportanceScorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub base: f64,
    /// error / critical content; `system:`-prefixed content also counts.
    pub high_value: MarkerRule,
    pub configuration: MarkerRule,
    pub code: MarkerRule,
    pub system_role: f64,
    pub task: MarkerRule,
    pub delivery: MarkerRule,
    /// Each rule is applied independently; weights are subtracted.
    pub filler: Vec<MarkerRule>,
    pub long_message_chars: usize,
    pub long_message_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 0.3,
            high_value: MarkerRule::new(&["error", "critical"], 0.4),
            configuration: MarkerRule::new(&["config", "setting", "parameter"], 0.3),
            code: MarkerRule::new(&["```", "fn ", "def ", "function "], 0.25),
            system_role: 0.3,
            task: MarkerRule::new(&["implement", "feature", "how do"], 0.2),
            delivery: MarkerRule::new(&["here is", "requested"], 0.15),
            filler: vec![
                MarkerRule::new(&["thanks", "thank you"], 0.1),
                MarkerRule::new(&["let me know"], 0.1),
                MarkerRule::new(&["find more information"], 0.15),
            ],
            long_message_chars: 1000,
            long_message_penalty: 0.1,
        }
    }
}

/// Scores messages by content markers and role.
#[derive(Debug, Clone, Default)]
pub struct ImportanceScorer {
    pub weights: ScoringWeights,
    pub thresholds: ImportanceThresholds,
}

impl ImportanceScorer {
    pub fn new(weights: ScoringWeights, thresholds: ImportanceThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn score(&self, message: &Message) -> f64 {
        self.score_parts(message.role, &message.content)
    }

    /// Scores raw role + content; used before a [`Message`] exists (append, merge).
    pub fn score_parts(&self, role: Role, content: &str) -> f64 {
        let w = &self.weights;
        let lower = content.to_lowercase();
        let mut score = w.base;

        if w.high_value.matches(&lower) || lower.trim_start().starts_with("system:") {
            score += w.high_value.weight;
        }
        for rule in [&w.configuration, &w.code, &w.task, &w.delivery] {
            if rule.matches(&lower) {
                score += rule.weight;
            }
        }
        if role == Role::System {
            score += w.system_role;
        }
        for rule in &w.filler {
            if rule.matches(&lower) {
                score -= rule.weight;
            }
        }
        if content.chars().count() > w.long_message_chars {
            score -= w.long_message_penalty;
        }
        score.clamp(0.0, 1.0)
    }

    pub fn level(&self, score: f64) -> ImportanceLevel {
        if score >= self.thresholds.high {
            ImportanceLevel::High
        } else if score >= self.thresholds.medium {
            ImportanceLevel::Medium
        } else {
            ImportanceLevel::Low
        }
    }
}
