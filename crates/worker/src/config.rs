use std::time::Duration;

use drip_core::config::EngineConfig;
use drip_core::error::CoreError;

/// Default seconds between completion sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub sweep_interval: Duration,
    /// Certificate issuer endpoint. Completions are only logged when unset.
    pub certificate_webhook_url: Option<String>,
    pub engine: EngineConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `DATABASE_URL`            | (required) |
    /// | `SWEEP_INTERVAL_SECS`     | `60`       |
    /// | `CERTIFICATE_WEBHOOK_URL` | unset      |
    /// | `COMPLETION_THRESHOLD`    | `90`       |
    /// | `PREREQUISITE_MODE`       | `single_hop` |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".to_string()))?;

        let sweep_interval_secs = match lookup("SWEEP_INTERVAL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(CoreError::Validation(format!(
                        "SWEEP_INTERVAL_SECS must be a positive integer, got '{raw}'"
                    )))
                }
            },
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        let certificate_webhook_url = lookup("CERTIFICATE_WEBHOOK_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let engine = EngineConfig::from_lookup(&lookup)?;

        Ok(Self {
            database_url,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            certificate_webhook_url,
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_database_url() {
        assert_matches!(
            WorkerConfig::from_lookup(lookup(&[])),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn applies_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/drip")]))
            .unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert!(config.certificate_webhook_url.is_none());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/drip"),
            ("SWEEP_INTERVAL_SECS", "15"),
            ("CERTIFICATE_WEBHOOK_URL", "https://certs.example.com/hook"),
            ("COMPLETION_THRESHOLD", "80"),
        ]))
        .unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(15));
        assert_eq!(
            config.certificate_webhook_url.as_deref(),
            Some("https://certs.example.com/hook")
        );
        assert_eq!(config.engine.completion_threshold, 80);
    }

    #[test]
    fn rejects_zero_interval() {
        let result = WorkerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/drip"),
            ("SWEEP_INTERVAL_SECS", "0"),
        ]));
        assert_matches!(result, Err(CoreError::Validation(_)));
    }
}
