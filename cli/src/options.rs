//! Resolves the effective [`CompactionConfig`]: library defaults, then the `[compaction]`
//! settings (file + `HISTRIM_*` env), then command-line flags.

use config::CompactionSection;
use histrim::{BudgetReservation, CompactionConfig, CompressionOrder};

use crate::error::CliError;

/// Flag overrides; `None` leaves the layer below untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target_reduction_ratio: Option<f64>,
    pub minimum_messages: Option<usize>,
    pub compression_order: Option<String>,
    pub budget_reservation: Option<String>,
}

pub fn resolve_config(
    section: &CompactionSection,
    overrides: &ConfigOverrides,
) -> Result<CompactionConfig, CliError> {
    let mut config = CompactionConfig::default();
    apply_section(&mut config, section)?;

    if let Some(v) = overrides.target_reduction_ratio {
        config.target_reduction_ratio = v;
    }
    if let Some(v) = overrides.minimum_messages {
        config.minimum_messages = v;
    }
    if let Some(v) = &overrides.compression_order {
        config.compression_order = parse_order(v)?;
    }
    if let Some(v) = &overrides.budget_reservation {
        config.budget_reservation = parse_reservation(v)?;
    }
    Ok(config.validated()?)
}

fn apply_section(config: &mut CompactionConfig, s: &CompactionSection) -> Result<(), CliError> {
    if let Some(v) = s.target_reduction_ratio {
        config.target_reduction_ratio = v;
    }
    if let Some(v) = s.minimum_messages {
        config.minimum_messages = v;
    }
    if let Some(v) = s.compression_length_threshold {
        config.compression_length_threshold = v;
    }
    if let Some(v) = s.compression_importance_cutoff {
        config.compression_importance_cutoff = v;
    }
    if let Some(v) = s.compression_keep_fraction {
        config.compression_keep_fraction = v;
    }
    if let Some(v) = s.minimum_compression_ratio {
        config.minimum_compression_ratio = v;
    }
    if let Some(v) = &s.compression_order {
        config.compression_order = parse_order(v)?;
    }
    if let Some(v) = &s.budget_reservation {
        config.budget_reservation = parse_reservation(v)?;
    }
    Ok(())
}

fn parse_order(value: &str) -> Result<CompressionOrder, CliError> {
    CompressionOrder::parse(value).ok_or_else(|| CliError::InvalidOption {
        key: "compression_order",
        value: value.to_string(),
    })
}

fn parse_reservation(value: &str) -> Result<BudgetReservation, CliError> {
    BudgetReservation::parse(value).ok_or_else(|| CliError::InvalidOption {
        key: "budget_reservation",
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_set() {
        let config =
            resolve_config(&CompactionSection::default(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config, CompactionConfig::default());
    }

    /// **Scenario**: flags beat the settings layer, which beats defaults.
    #[test]
    fn flags_override_settings() {
        let section = CompactionSection {
            minimum_messages: Some(20),
            compression_keep_fraction: Some(0.5),
            compression_order: Some("disabled".into()),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            minimum_messages: Some(5),
            budget_reservation: Some("union".into()),
            ..Default::default()
        };
        let config = resolve_config(&section, &overrides).unwrap();
        assert_eq!(config.minimum_messages, 5);
        assert_eq!(config.compression_keep_fraction, 0.5);
        assert_eq!(config.compression_order, CompressionOrder::Disabled);
        assert_eq!(config.budget_reservation, BudgetReservation::Union);
        assert_eq!(config.target_reduction_ratio, 0.20);
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let section = CompactionSection {
            compression_order: Some("sideways".into()),
            ..Default::default()
        };
        let err = resolve_config(&section, &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(
            err,
            CliError::InvalidOption {
                key: "compression_order",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_value_fails_validation() {
        let overrides = ConfigOverrides {
            target_reduction_ratio: Some(1.5),
            ..Default::default()
        };
        let err = resolve_config(&CompactionSection::default(), &overrides).unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(histrim::ConfigError::ReductionRatio(_))
        ));
    }
}
