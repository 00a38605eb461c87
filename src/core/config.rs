use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// How `Holding (%)` values are turned into 0-1 weights.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HoldingScale {
    /// Values above 1 are percentages, values up to 1 are already fractions.
    #[default]
    Auto,
    /// Every value is a percentage.
    Percent,
    /// Every value is already a fraction.
    Fraction,
}

impl HoldingScale {
    pub fn to_fraction(&self, holding: f64) -> f64 {
        match self {
            HoldingScale::Auto if holding > 1.0 => holding / 100.0,
            HoldingScale::Auto | HoldingScale::Fraction => holding,
            HoldingScale::Percent => holding / 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A directory with one CSV file per section.
    #[default]
    Csv,
    /// A single JSON document holding every section.
    Json,
}

fn default_grand_totals() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_grand_totals")]
    pub grand_totals: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: OutputFormat::default(),
            grand_totals: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub holding_scale: HoldingScale,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Loads the config at the default location, falling back to defaults
    /// when no file has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "mfcontrib", "mfcontrib")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
holding_scale: percent
output:
  format: json
  grand_totals: false
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.holding_scale, HoldingScale::Percent);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.grand_totals);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("output: {}").unwrap();
        assert_eq!(config.holding_scale, HoldingScale::Auto);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert!(config.output.grand_totals);

        let config: AppConfig = serde_yaml::from_str("holding_scale: fraction").unwrap();
        assert_eq!(config.holding_scale, HoldingScale::Fraction);
        assert!(config.output.grand_totals);
    }

    #[test]
    fn test_invalid_scale_is_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("holding_scale: basis_points");
        assert!(result.is_err());
    }

    #[test]
    fn test_holding_scale_conversion() {
        assert_eq!(HoldingScale::Auto.to_fraction(10.0), 0.1);
        assert_eq!(HoldingScale::Auto.to_fraction(0.1), 0.1);
        assert_eq!(HoldingScale::Auto.to_fraction(1.0), 1.0);
        assert_eq!(HoldingScale::Percent.to_fraction(1.0), 0.01);
        assert_eq!(HoldingScale::Fraction.to_fraction(12.0), 12.0);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = AppConfig::load_from_path(dir.path().join("missing.yaml"));
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }
}
