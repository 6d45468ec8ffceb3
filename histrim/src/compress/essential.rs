//! Essential-message classification: content that must never be evicted.

use crate::message::Message;

/// Keywords that make a message essential (matched case-insensitively as substrings).
pub const DEFAULT_ESSENTIAL_KEYWORDS: &[&str] = &["system:", "error:", "critical", "config:"];

/// Marks fatal, system-level and configuration messages as never evictable.
#[derive(Debug, Clone)]
pub struct EssentialClassifier {
    keywords: Vec<String>,
}

impl Default for EssentialClassifier {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_ESSENTIAL_KEYWORDS.iter().copied())
    }
}

impl EssentialClassifier {
    /// Builds a classifier from custom keywords; they are lowercased once here.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_essential(&self, message: &Message) -> bool {
        self.is_essential_text(&message.content)
    }

    pub fn is_essential_text(&self, content: &str) -> bool {
        let lower = content.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keywords_match_case_insensitively() {
        let c = EssentialClassifier::default();
        assert!(c.is_essential_text("SYSTEM: Authentication failed"));
        assert!(c.is_essential_text("ERROR: Configuration file corrupted"));
        assert!(c.is_essential_text("CRITICAL: Database connection lost"));
        assert!(c.is_essential_text("Config: Updated memory limit to 8GB"));
        assert!(c.is_essential_text("this is critically important"));
    }

    /// **Scenario**: near-misses without the colon are not essential.
    #[test]
    fn keyword_without_colon_is_not_essential() {
        let c = EssentialClassifier::default();
        assert!(!c.is_essential_text("there was an error somewhere"));
        assert!(!c.is_essential_text("the config looks fine"));
        assert!(!c.is_essential_text("system prompt"));
        assert!(!c.is_essential_text(""));
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let c = EssentialClassifier::with_keywords(["Decision:", ""]);
        assert_eq!(c.keywords(), &["decision:".to_string()]);
        assert!(c.is_essential_text("DECISION: use sqlite"));
        assert!(!c.is_essential_text("ERROR: boom"));
    }
}
