use crate::error::CoreError;
use crate::prerequisites::PrerequisiteMode;
use crate::progress::DEFAULT_COMPLETION_THRESHOLD;

/// Tunables for the release and progress engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Content percent at which an item counts as complete (1..=100).
    pub completion_threshold: u8,
    /// Whether `after_content` checks the direct prerequisite or the whole chain.
    pub prerequisite_mode: PrerequisiteMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            prerequisite_mode: PrerequisiteMode::SingleHop,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default      |
    /// |------------------------|--------------|
    /// | `COMPLETION_THRESHOLD` | `90`         |
    /// | `PREREQUISITE_MODE`    | `single_hop` |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("COMPLETION_THRESHOLD") {
            config.completion_threshold = validate_threshold(&raw)?;
        }
        if let Some(raw) = lookup("PREREQUISITE_MODE") {
            config.prerequisite_mode = PrerequisiteMode::from_str_value(raw.trim())?;
        }
        Ok(config)
    }
}

fn validate_threshold(raw: &str) -> Result<u8, CoreError> {
    match raw.trim().parse::<u8>() {
        Ok(t) if (1..=100).contains(&t) => Ok(t),
        _ => Err(CoreError::Validation(format!(
            "COMPLETION_THRESHOLD must be an integer between 1 and 100, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.completion_threshold, 90);
    }

    #[test]
    fn reads_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("COMPLETION_THRESHOLD", "95"),
            ("PREREQUISITE_MODE", "transitive"),
        ]))
        .unwrap();
        assert_eq!(config.completion_threshold, 95);
        assert_eq!(config.prerequisite_mode, PrerequisiteMode::Transitive);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(EngineConfig::from_lookup(lookup(&[("COMPLETION_THRESHOLD", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("COMPLETION_THRESHOLD", "101")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("COMPLETION_THRESHOLD", "ninety")])).is_err());
    }
}
