//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::wells::normalize_well;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// wellcontrast - treated vs. control differential expression for LINCS plates
///
/// Scores landmark genes by the difference between treatment-well and
/// control-well means, ranks them, and looks up enriched pathways.
///
/// Examples:
///   wellcontrast --matrix L5_subset.csv --gene-info geneinfo_beta.txt --list-wells
///   wellcontrast --matrix L5_subset.csv --gene-info geneinfo_beta.txt --treatment B01,B02
///   wellcontrast -m L5_subset.csv -g geneinfo_beta.txt -t B01 --no-enrich --format json
///   wellcontrast --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Expression matrix (comma-delimited, `rid` column plus `<prefix>:<well>` columns)
    #[arg(
        short,
        long,
        value_name = "CSV",
        required_unless_present = "init_config"
    )]
    pub matrix: Option<PathBuf>,

    /// Gene annotation table (tab-delimited, `pr_gene_id`, `pr_gene_symbol`, `pr_is_lm`)
    #[arg(
        short,
        long = "gene-info",
        value_name = "TSV",
        required_unless_present = "init_config"
    )]
    pub gene_info: Option<PathBuf>,

    /// Treatment wells (comma-separated)
    ///
    /// Example: --treatment B01,B02,B03
    #[arg(short, long, value_name = "WELLS", value_delimiter = ',')]
    pub treatment: Vec<String>,

    /// Print the wells found in the matrix and exit
    #[arg(long)]
    pub list_wells: bool,

    /// Number of genes shown in the ranked table
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Number of enrichment terms shown and plotted
    #[arg(long, value_name = "COUNT")]
    pub top_terms: Option<usize>,

    /// Skip the pathway enrichment lookup
    #[arg(long)]
    pub no_enrich: bool,

    /// Enrichr API base URL
    #[arg(long, value_name = "URL", env = "WELLCONTRAST_ENRICHR_URL")]
    pub enrichr_url: Option<String>,

    /// Gene-set libraries to query (comma-separated)
    #[arg(long, value_name = "LIBS", value_delimiter = ',')]
    pub libraries: Option<Vec<String>>,

    /// Adjusted p-value cutoff for enrichment terms
    #[arg(long, value_name = "P")]
    pub cutoff: Option<f64>,

    /// Enrichment request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Directory to write plot data CSVs into
    #[arg(long, value_name = "DIR")]
    pub plot_data: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wellcontrast.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .wellcontrast.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        for (label, path) in [("Expression matrix", &self.matrix), ("Gene annotation", &self.gene_info)] {
            match path {
                Some(p) if !p.is_file() => {
                    return Err(format!("{} file does not exist: {}", label, p.display()));
                }
                None => return Err(format!("{} file is required", label)),
                _ => {}
            }
        }

        if !self.list_wells && self.treatment_wells().is_empty() {
            return Err("At least one treatment well is required (--treatment)".to_string());
        }

        if let Some(ref url) = self.enrichr_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Enrichr URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(cutoff) = self.cutoff {
            if !(cutoff > 0.0 && cutoff <= 1.0) {
                return Err("Cutoff must be in (0, 1]".to_string());
            }
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if let Some(ref libraries) = self.libraries {
            if libraries.iter().all(|l| l.trim().is_empty()) {
                return Err("--libraries must name at least one library".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Treatment wells, normalized and without blanks.
    pub fn treatment_wells(&self) -> Vec<String> {
        self.treatment
            .iter()
            .map(|w| normalize_well(w))
            .filter(|w| !w.is_empty())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    pub(crate) fn make_args() -> Args {
        Args {
            matrix: Some(fixture("l5_subset.csv")),
            gene_info: Some(fixture("gene_info.txt")),
            treatment: vec!["B01".to_string()],
            list_wells: false,
            top: None,
            top_terms: None,
            no_enrich: false,
            enrichr_url: None,
            libraries: None,
            cutoff: None,
            timeout: None,
            output: None,
            format: None,
            plot_data: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_parse_command_line() {
        let args = Args::try_parse_from([
            "wellcontrast",
            "--matrix",
            "a.csv",
            "--gene-info",
            "b.txt",
            "--treatment",
            "b01, B02",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.treatment_wells(), vec!["B01", "B02"]);
        assert_eq!(args.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_missing_inputs_rejected_by_parser() {
        assert!(Args::try_parse_from(["wellcontrast", "--treatment", "B01"]).is_err());
        assert!(Args::try_parse_from(["wellcontrast", "--init-config"]).is_ok());
    }

    #[test]
    fn test_validation_missing_file() {
        let mut args = make_args();
        args.matrix = Some(PathBuf::from("/nonexistent/l5.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_treatment() {
        let mut args = make_args();
        args.treatment = vec![" ".to_string()];
        assert!(args.validate().is_err());

        args.list_wells = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_cutoff_range() {
        let mut args = make_args();
        args.cutoff = Some(0.0);
        assert!(args.validate().is_err());
        args.cutoff = Some(1.5);
        assert!(args.validate().is_err());
        args.cutoff = Some(0.05);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.enrichr_url = Some("maayanlab.cloud/Enrichr".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }
}
