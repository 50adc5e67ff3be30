use crate::error::ConfigError;
use rust_decimal::Decimal;
use std::path::PathBuf;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalysisDefaults, BatchConfig, ClientConfig, ClientSettings, LoggingConfig, PipelineConfig,
    PlatformConfig,
};

/// Prefix for environment overrides, e.g. `LEDGERLENS__BATCH__MAX_WORKERS=4`.
const ENV_PREFIX: &str = "LEDGERLENS";

/// Loads the platform configuration from a layered set of TOML files.
///
/// Files are applied in order, later ones overriding earlier ones; files that do not
/// exist are skipped. Environment variables prefixed with `LEDGERLENS__` are applied
/// last. With no files and no environment, every field takes its default.
pub fn load_config(paths: &[PathBuf]) -> Result<PlatformConfig, ConfigError> {
    let mut builder = config::Config::builder();
    for path in paths {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config layer not found, skipping.");
            continue;
        }
        builder = builder.add_source(config::File::from(path.as_path()));
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `PlatformConfig` struct
    let config = config.try_deserialize::<PlatformConfig>()?;
    validate(&config)?;

    Ok(config)
}

/// Checks the invariants serde cannot express.
pub fn validate(config: &PlatformConfig) -> Result<(), ConfigError> {
    if config.batch.max_workers == 0 {
        return Err(ConfigError::Validation(
            "batch.max_workers must be at least 1".to_string(),
        ));
    }
    check_top_n("analysis.top_n", config.analysis.top_n)?;
    check_ic_rate("analysis.ic_rate", config.analysis.ic_rate)?;

    for (client_id, client) in &config.clients {
        if let Some(top_n) = client.top_n {
            check_top_n(&format!("clients.{client_id}.top_n"), top_n)?;
        }
        if let Some(ic_rate) = client.ic_rate {
            check_ic_rate(&format!("clients.{client_id}.ic_rate"), ic_rate)?;
        }
    }
    Ok(())
}

fn check_top_n(field: &str, top_n: usize) -> Result<(), ConfigError> {
    if top_n == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be at least 1"
        )));
    }
    Ok(())
}

fn check_ic_rate(field: &str, ic_rate: Decimal) -> Result<(), ConfigError> {
    if ic_rate < Decimal::ZERO || ic_rate >= Decimal::ONE {
        return Err(ConfigError::Validation(format!(
            "{field} must be a fraction in [0, 1), got {ic_rate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::SlideIdPolicy;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let config = load_config(&[]).unwrap();
        assert_eq!(config.base_output_dir, PathBuf::from("output"));
        assert_eq!(config.batch.max_workers, 1);
        assert_eq!(config.analysis.top_n, 50);
        assert_eq!(config.slide_id_policy, SlideIdPolicy::Reject);
        assert!(config.pipeline("txn").enabled);
    }

    #[test]
    fn test_layers_override_in_order() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("platform.toml");
        let overlay = dir.path().join("txn.toml");
        fs::write(
            &base,
            r#"
base_output_dir = "reports"
slide_id_policy = "last_wins"

[analysis]
top_n = 25
ic_rate = 0.0015

[clients.1453]
client_name = "Harbor Credit Union"
"#,
        )
        .unwrap();
        fs::write(
            &overlay,
            r#"
[analysis]
top_n = 10

[pipelines.txn]
modules = ["top_merchants_by_spend", "portfolio_scorecard"]
"#,
        )
        .unwrap();

        let missing = dir.path().join("absent.toml");
        let config = load_config(&[base, missing, overlay]).unwrap();

        assert_eq!(config.base_output_dir, PathBuf::from("reports"));
        assert_eq!(config.slide_id_policy, SlideIdPolicy::LastWins);
        assert_eq!(config.analysis.top_n, 10);
        assert_eq!(config.analysis.ic_rate, dec!(0.0015));
        assert_eq!(
            config.pipeline("txn").modules.unwrap(),
            vec!["top_merchants_by_spend", "portfolio_scorecard"]
        );

        let client = config.client_settings("1453");
        assert_eq!(client.client_name, "Harbor Credit Union");
        assert_eq!(client.top_n, 10);

        let unknown = config.client_settings("9999");
        assert_eq!(unknown.client_name, "9999");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PlatformConfig::default();
        config.batch.max_workers = 0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Configuration validation error: batch.max_workers must be at least 1"
        );

        let mut config = PlatformConfig::default();
        config.analysis.ic_rate = dec!(1.5);
        assert!(validate(&config).is_err());

        let mut config = PlatformConfig::default();
        config.clients.insert(
            "42".to_string(),
            ClientConfig {
                top_n: Some(0),
                ..ClientConfig::default()
            },
        );
        assert!(validate(&config).is_err());
    }
}
