//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.wellcontrast.toml` files.

use crate::cli::OutputFormat;
use crate::enrichment::EnrichrConfig;
use crate::report::MarkdownOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".wellcontrast.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Pathway enrichment settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "wellcontrast_report.md".to_string()
}

/// Enrichr lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Run the lookup at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Enrichr API base URL.
    #[serde(default = "default_enrichr_url")]
    pub url: String,

    /// Gene-set libraries to query.
    #[serde(default = "default_libraries")]
    pub libraries: Vec<String>,

    /// Adjusted p-value cutoff.
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of terms shown and plotted.
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,

    /// Description attached to the uploaded gene list.
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_enrichr_url(),
            libraries: default_libraries(),
            cutoff: default_cutoff(),
            timeout_seconds: default_timeout(),
            top_terms: default_top_terms(),
            description: default_description(),
        }
    }
}

fn default_enrichr_url() -> String {
    EnrichrConfig::default().base_url
}

fn default_libraries() -> Vec<String> {
    EnrichrConfig::default().libraries
}

fn default_cutoff() -> f64 {
    0.05
}

fn default_timeout() -> u64 {
    300
}

fn default_top_terms() -> usize {
    10
}

fn default_description() -> String {
    EnrichrConfig::default().description
}

impl From<&EnrichmentConfig> for EnrichrConfig {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            libraries: config.libraries.clone(),
            cutoff: config.cutoff,
            timeout_seconds: config.timeout_seconds,
            description: config.description.clone(),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of genes shown in the ranked table.
    #[serde(default = "default_top_genes")]
    pub top_genes: usize,

    /// Include the volcano text plot.
    #[serde(default = "default_true")]
    pub include_volcano: bool,

    /// Include the pathway bar chart.
    #[serde(default = "default_true")]
    pub include_pathway_chart: bool,

    /// Character width of the text charts.
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_genes: default_top_genes(),
            include_volcano: true,
            include_pathway_chart: true,
            chart_width: default_chart_width(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_genes() -> usize {
    20
}

fn default_chart_width() -> usize {
    60
}

impl From<&ReportConfig> for MarkdownOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            include_volcano: config.include_volcano,
            include_pathway_chart: config.include_pathway_chart,
            chart_width: config.chart_width,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if args.no_enrich {
            self.enrichment.enabled = false;
        }
        if let Some(ref url) = args.enrichr_url {
            self.enrichment.url = url.clone();
        }
        if let Some(ref libraries) = args.libraries {
            self.enrichment.libraries = libraries.clone();
        }
        if let Some(cutoff) = args.cutoff {
            self.enrichment.cutoff = cutoff;
        }
        if let Some(timeout) = args.timeout {
            self.enrichment.timeout_seconds = timeout;
        }
        if let Some(top_terms) = args.top_terms {
            self.enrichment.top_terms = top_terms;
        }

        if let Some(top) = args.top {
            self.report.top_genes = top;
        }
    }

    /// Check the merged settings.
    ///
    /// Runs after `merge_with_args` so that values coming from the file get
    /// the same range checks as command-line values.
    pub fn validate(&self) -> Result<()> {
        let e = &self.enrichment;
        if !(e.cutoff > 0.0 && e.cutoff <= 1.0) {
            bail!("enrichment.cutoff must be in (0, 1], got {}", e.cutoff);
        }
        if e.timeout_seconds == 0 {
            bail!("enrichment.timeout_seconds must be at least 1");
        }
        if e.enabled && e.libraries.iter().all(|l| l.trim().is_empty()) {
            bail!("enrichment.libraries must name at least one library");
        }
        if e.enabled && !e.url.starts_with("http://") && !e.url.starts_with("https://") {
            bail!("enrichment.url must start with 'http://' or 'https://'");
        }
        if self.report.top_genes == 0 {
            bail!("report.top_genes must be at least 1");
        }
        Ok(())
    }

    /// Log level from the merged settings; `--quiet` wins over `verbose`.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if args.quiet {
            tracing::Level::ERROR
        } else if args.verbose || self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
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
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "wellcontrast_report.md");
        assert_eq!(config.enrichment.cutoff, 0.05);
        assert_eq!(config.enrichment.top_terms, 10);
        assert_eq!(config.report.top_genes, 20);
        assert!(config
            .enrichment
            .libraries
            .contains(&"KEGG_2019_Human".to_string()));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "plate7.md"
format = "json"

[enrichment]
libraries = ["Reactome_2022"]
cutoff = 0.01

[report]
top_genes = 50
include_volcano = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "plate7.md");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.enrichment.libraries, vec!["Reactome_2022"]);
        assert_eq!(config.enrichment.cutoff, 0.01);
        assert_eq!(config.enrichment.timeout_seconds, 300);
        assert_eq!(config.report.top_genes, 50);
        assert!(!config.report.include_volcano);
        assert!(config.report.include_pathway_chart);
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config: Config = toml::from_str("[report]\ntop_genes = 50\n").unwrap();
        let mut args = make_args();
        config.merge_with_args(&args);
        assert_eq!(config.report.top_genes, 50);
        assert!(config.enrichment.enabled);

        args.top = Some(5);
        args.no_enrich = true;
        args.cutoff = Some(0.1);
        config.merge_with_args(&args);
        assert_eq!(config.report.top_genes, 5);
        assert!(!config.enrichment.enabled);
        assert_eq!(config.enrichment.cutoff, 0.1);
    }

    #[test]
    fn test_enrichr_config_from_settings() {
        let settings = EnrichmentConfig {
            url: "http://localhost:8080/Enrichr".to_string(),
            timeout_seconds: 30,
            ..EnrichmentConfig::default()
        };
        let enrichr = EnrichrConfig::from(&settings);
        assert_eq!(enrichr.base_url, "http://localhost:8080/Enrichr");
        assert_eq!(enrichr.timeout_seconds, 30);
        assert_eq!(enrichr.cutoff, 0.05);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[enrichment]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.chart_width, 60);
    }

    #[test]
    fn test_validate_rejects_bad_file_values() {
        assert!(Config::default().validate().is_ok());

        for content in [
            "[enrichment]\ntimeout_seconds = 0\n",
            "[enrichment]\ncutoff = 0.0\n",
            "[enrichment]\nlibraries = []\n",
            "[report]\ntop_genes = 0\n",
        ] {
            let config: Config = toml::from_str(content).unwrap();
            assert!(config.validate().is_err(), "accepted {:?}", content);
        }
    }

    #[test]
    fn test_cli_value_repairs_file_value() {
        let mut config: Config = toml::from_str("[enrichment]\ntimeout_seconds = 0\n").unwrap();
        let mut args = make_args();
        args.timeout = Some(30);
        config.merge_with_args(&args);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_verbose_from_config_file() {
        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let mut args = make_args();
        assert_eq!(config.log_level(&args), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(config.log_level(&args), tracing::Level::ERROR);

        args.quiet = false;
        assert_eq!(Config::default().log_level(&args), tracing::Level::INFO);
    }
}
