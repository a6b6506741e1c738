//! Configuration resolution with source precedence.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`TUGBLOCK_FLAGS`, `TUGBLOCK_COMPACT`)
//! 3. Defaults

use tracing::warn;

use crate::flags::CompilerFlags;

/// Environment variable holding default compiler flags.
pub const ENV_FLAGS: &str = "TUGBLOCK_FLAGS";
/// Environment variable selecting compact JSON output.
pub const ENV_COMPACT: &str = "TUGBLOCK_COMPACT";

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From environment variable.
    EnvVar = 1,
    /// From CLI flag (highest precedence).
    CliFlag = 2,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --flags
    pub flags: Option<CompilerFlags>,
    /// --compact
    pub compact: Option<bool>,
}

/// Resolved configuration with precedence information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Compiler flags applied to every parsed block.
    pub flags: ConfigValue<CompilerFlags>,
    /// Emit single-line JSON instead of pretty-printed.
    pub compact: ConfigValue<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            flags: ConfigValue::new(CompilerFlags::NONE, ConfigSource::Default),
            compact: ConfigValue::new(false, ConfigSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from the process environment and CLI overrides.
    pub fn resolve(cli_overrides: &CliOverrides) -> Self {
        Self::resolve_with(cli_overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration using `lookup` in place of the process environment.
    pub fn resolve_with<F>(cli_overrides: &CliOverrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ResolvedConfig::default();
        config.apply_env_vars(lookup);
        config.apply_cli_overrides(cli_overrides);
        config
    }

    fn apply_env_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_FLAGS) {
            match raw.parse::<CompilerFlags>() {
                Ok(flags) => {
                    self.flags = self
                        .flags
                        .clone()
                        .merge(ConfigValue::new(flags, ConfigSource::EnvVar));
                }
                Err(err) => warn!("ignoring {}: {}", ENV_FLAGS, err),
            }
        }

        if let Some(raw) = lookup(ENV_COMPACT) {
            match parse_bool(&raw) {
                Some(compact) => {
                    self.compact = self
                        .compact
                        .clone()
                        .merge(ConfigValue::new(compact, ConfigSource::EnvVar));
                }
                None => warn!("ignoring {}: expected a boolean, got '{}'", ENV_COMPACT, raw),
            }
        }
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(flags) = overrides.flags {
            self.flags = ConfigValue::new(flags, ConfigSource::CliFlag);
        }
        if let Some(compact) = overrides.compact {
            self.compact = ConfigValue::new(compact, ConfigSource::CliFlag);
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ResolvedConfig::resolve_with(&CliOverrides::default(), env(&[]));
        assert_eq!(config.flags.value, CompilerFlags::NONE);
        assert_eq!(config.flags.source, ConfigSource::Default);
        assert!(!config.compact.value);
    }

    #[test]
    fn env_overrides_default() {
        let config = ResolvedConfig::resolve_with(
            &CliOverrides::default(),
            env(&[(ENV_FLAGS, "print_function"), (ENV_COMPACT, "yes")]),
        );
        assert_eq!(config.flags.value, CompilerFlags::PRINT_FUNCTION);
        assert_eq!(config.flags.source, ConfigSource::EnvVar);
        assert!(config.compact.value);
    }

    #[test]
    fn cli_overrides_env() {
        let overrides = CliOverrides {
            flags: Some(CompilerFlags::DIVISION),
            compact: Some(false),
        };
        let config = ResolvedConfig::resolve_with(
            &overrides,
            env(&[(ENV_FLAGS, "0x10000"), (ENV_COMPACT, "1")]),
        );
        assert_eq!(config.flags.value, CompilerFlags::DIVISION);
        assert_eq!(config.flags.source, ConfigSource::CliFlag);
        assert!(!config.compact.value);
        assert_eq!(config.compact.source, ConfigSource::CliFlag);
    }

    #[test]
    fn bad_env_value_is_ignored() {
        let config = ResolvedConfig::resolve_with(
            &CliOverrides::default(),
            env(&[(ENV_FLAGS, "not_a_feature"), (ENV_COMPACT, "maybe")]),
        );
        assert_eq!(config.flags.source, ConfigSource::Default);
        assert_eq!(config.compact.source, ConfigSource::Default);
    }

    #[test]
    fn merge_prefers_higher_precedence() {
        let low = ConfigValue::new(1, ConfigSource::EnvVar);
        let high = ConfigValue::new(2, ConfigSource::CliFlag);
        assert_eq!(high.clone().merge(low.clone()).value, 2);
        assert_eq!(low.merge(high).value, 2);
    }
}
