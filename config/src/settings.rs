//! Typed settings: the `[compaction]` table overlaid by `<APP>_*` environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LoadError;

/// Compaction overrides. `None` means "use the library default".
///
/// Enum-valued settings stay strings here; the consumer parses them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSection {
    pub target_reduction_ratio: Option<f64>,
    pub minimum_messages: Option<usize>,
    pub compression_length_threshold: Option<usize>,
    pub compression_importance_cutoff: Option<f64>,
    pub compression_keep_fraction: Option<f64>,
    pub minimum_compression_ratio: Option<f64>,
    pub compression_order: Option<String>,
    pub budget_reservation: Option<String>,
}

impl CompactionSection {
    /// Replaces fields with `<prefix>TARGET_REDUCTION_RATIO`, `<prefix>MINIMUM_MESSAGES`, ...
    /// when those variables are set. Empty values are ignored.
    pub fn overlay_env(&mut self, prefix: &str) -> Result<(), LoadError> {
        overlay(prefix, "TARGET_REDUCTION_RATIO", &mut self.target_reduction_ratio)?;
        overlay(prefix, "MINIMUM_MESSAGES", &mut self.minimum_messages)?;
        overlay(
            prefix,
            "COMPRESSION_LENGTH_THRESHOLD",
            &mut self.compression_length_threshold,
        )?;
        overlay(
            prefix,
            "COMPRESSION_IMPORTANCE_CUTOFF",
            &mut self.compression_importance_cutoff,
        )?;
        overlay(
            prefix,
            "COMPRESSION_KEEP_FRACTION",
            &mut self.compression_keep_fraction,
        )?;
        overlay(
            prefix,
            "MINIMUM_COMPRESSION_RATIO",
            &mut self.minimum_compression_ratio,
        )?;
        overlay(prefix, "COMPRESSION_ORDER", &mut self.compression_order)?;
        overlay(prefix, "BUDGET_RESERVATION", &mut self.budget_reservation)?;
        Ok(())
    }
}

fn overlay<T: FromStr>(prefix: &str, name: &str, slot: &mut Option<T>) -> Result<(), LoadError> {
    let key = format!("{}{}", prefix, name);
    let Ok(raw) = std::env::var(&key) else {
        return Ok(());
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(());
    }
    let parsed = value.parse::<T>().map_err(|_| LoadError::InvalidValue {
        key: key.clone(),
        value: value.to_string(),
    })?;
    *slot = Some(parsed);
    Ok(())
}

/// Everything [`load_and_apply`](crate::load_and_apply) resolves beyond the process env.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub compaction: CompactionSection,
}

/// `histrim` -> `HISTRIM_`, `my-app` -> `MY_APP_`.
pub fn env_prefix(app_name: &str) -> String {
    let mut prefix: String = app_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    prefix.push('_');
    prefix
}
