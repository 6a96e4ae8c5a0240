use crate::scenario;
use splitledger_application::LedgerConfig;
use splitledger_infrastructure::DEFAULT_ID_LENGTH;
use std::{env, path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const LOG_VAR: &str = "SPLITLEDGER_LOG";
const ID_LENGTH_VAR: &str = "SPLITLEDGER_ID_LENGTH";
const ID_ATTEMPTS_VAR: &str = "SPLITLEDGER_ID_ATTEMPTS";
const SCENARIO_VAR: &str = "SPLITLEDGER_SCENARIO";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer (found `{value}`)")]
    InvalidNumber { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment and an optional `.env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub log_filter: String,
    pub id_length: usize,
    pub id_attempts: u32,
    pub scenario: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            id_length: DEFAULT_ID_LENGTH,
            id_attempts: LedgerConfig::DEFAULT_MAX_ID_ATTEMPTS,
            scenario: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            log_filter: lookup(LOG_VAR).unwrap_or(defaults.log_filter),
            id_length: positive(&lookup, ID_LENGTH_VAR)?.unwrap_or(defaults.id_length),
            id_attempts: positive(&lookup, ID_ATTEMPTS_VAR)?.unwrap_or(defaults.id_attempts),
            scenario: lookup(SCENARIO_VAR).map(PathBuf::from),
        })
    }
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(Some(parsed)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}

/// Installs the tracing subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Replays the scenario named on the command line (or in
/// `SPLITLEDGER_SCENARIO`) and prints the reports it produces.
pub async fn run() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    init_logging(&config.log_filter);

    let Some(path) = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.scenario.clone())
    else {
        tracing::error!("No scenario given; pass a path or set {SCENARIO_VAR}");
        std::process::exit(2);
    };

    match scenario::replay_file(&path, &config).await {
        Ok(report) => {
            print!("{}", report.output);
            tracing::info!(
                applied = report.applied,
                rejected = report.rejected,
                "Scenario replay finished"
            );
        }
        Err(err) => {
            tracing::error!(error = %err, "Scenario replay failed");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[])),
            Ok(AppConfig::default())
        );
    }

    #[test]
    fn values_are_read_from_environment() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (LOG_VAR, "debug,splitledger_domain=trace"),
            (ID_LENGTH_VAR, "16"),
            (ID_ATTEMPTS_VAR, " 3 "),
            (SCENARIO_VAR, "demos/weekend-trip.json"),
        ]))
        .unwrap();

        assert_eq!(config.log_filter, "debug,splitledger_domain=trace");
        assert_eq!(config.id_length, 16);
        assert_eq!(config.id_attempts, 3);
        assert_eq!(config.scenario, Some(PathBuf::from("demos/weekend-trip.json")));
    }

    #[rstest]
    #[case::zero(ID_LENGTH_VAR, "0")]
    #[case::negative(ID_ATTEMPTS_VAR, "-1")]
    #[case::garbage(ID_ATTEMPTS_VAR, "many")]
    fn invalid_numbers_are_rejected(#[case] name: &'static str, #[case] value: &str) {
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(name, value)])),
            Err(ConfigError::InvalidNumber {
                name,
                value: value.to_string()
            })
        );
    }
}
