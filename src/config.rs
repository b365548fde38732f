//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pulsedash.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".pulsedash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub data: DataConfig,

    /// View settings.
    #[serde(default)]
    pub views: ViewsConfig,

    /// Query cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "pulse_report.md".to_string()
}

/// Data source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// SQLite database or JSON snapshot to read.
    #[serde(default)]
    pub path: Option<String>,
}

/// Dashboard view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Rows in top/bottom rankings.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Rows in the state-wise transaction ranking.
    #[serde(default = "default_state_top_n")]
    pub state_top_n: usize,

    /// Threshold between low and high normalized scores in the growth
    /// potential matrix.
    #[serde(default = "default_quadrant_threshold")]
    pub quadrant_threshold: f64,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            state_top_n: default_state_top_n(),
            quadrant_threshold: default_quadrant_threshold(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_state_top_n() -> usize {
    15
}

fn default_quadrant_threshold() -> f64 {
    0.5
}

/// Query cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Memoize source queries for the life of the run.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.views.top_n == 0 || self.views.state_top_n == 0 {
            anyhow::bail!("views.top_n and views.state_top_n must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.views.quadrant_threshold) {
            anyhow::bail!(
                "views.quadrant_threshold must be between 0.0 and 1.0, got {}",
                self.views.quadrant_threshold
            );
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.data.path = Some(data.display().to_string());
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(top) = args.top {
            self.views.top_n = top;
        }

        // Flags always override
        if args.no_cache {
            self.cache.enabled = false;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "pulse_report.md");
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.data.path, None);
        assert_eq!(config.views.top_n, 10);
        assert_eq!(config.views.state_top_n, 15);
        assert_eq!(config.views.quadrant_threshold, 0.5);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.json"
format = "json"
verbose = true

[data]
path = "pulse.db"

[views]
top_n = 5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.json");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert!(config.general.verbose);
        assert_eq!(config.data.path.as_deref(), Some("pulse.db"));
        assert_eq!(config.views.top_n, 5);
        assert_eq!(config.views.state_top_n, 15);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_load_rejects_bad_threshold() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[views]\nquadrant_threshold = 1.5").unwrap();
        assert!(Config::load(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nenabled = false").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config: Config = toml::from_str(
            r#"
[general]
output = "from_file.md"

[data]
path = "file.db"

[views]
top_n = 3
"#,
        )
        .unwrap();

        let args = Args::parse_from(["pulsedash", "--top", "7", "--no-cache", "--format", "json"]);
        config.merge_with_args(&args);

        assert_eq!(config.general.output, "from_file.md");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.views.top_n, 7);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[views]"));
        assert!(toml_str.contains("[cache]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.views.top_n, 10);
    }
}
