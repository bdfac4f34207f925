//! wellcontrast - treated vs. control differential expression for LINCS plates
//!
//! A CLI tool that scores landmark genes by the difference between
//! treatment-well and control-well means, ranks them, looks up enriched
//! pathways with Enrichr, and writes a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad input tables, empty selection, enrichment failure, IO)

mod analysis;
mod cli;
mod config;
mod enrichment;
mod error;
mod loader;
mod models;
mod report;
mod wells;

use analysis::pipeline::resolve_columns;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use enrichment::{EnrichrClient, EnrichrConfig};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ExpressionMatrix, ExpressionSummary, Report, ReportMetadata};
use report::MarkdownOptions;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides the log level, so it is read before logging starts
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);
    if let Err(e) = config.validate() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    init_logging(config.log_level(&args));

    info!("wellcontrast v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", config_source);
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("Comparison failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .wellcontrast.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize libraries, cutoff, report size, and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the comparison workflow.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    // validate() guarantees both paths when not in --init-config mode
    let matrix_path = args.matrix.clone().unwrap_or_default();
    let annotation_path = args.gene_info.clone().unwrap_or_default();

    // Step 1: Load the expression matrix
    println!("📥 Loading expression matrix: {}", matrix_path.display());
    let matrix = loader::load_expression_matrix(&matrix_path)?;
    let known_wells = wells::discover_wells(&matrix);

    if args.list_wells {
        print_wells(&known_wells);
        return Ok(());
    }

    // Step 2: Resolve the well selection
    let treatment_wells = select_treatment_wells(&args, &known_wells);
    let control_wells = wells::control_wells();
    println!(
        "🧪 Treatment wells: {}",
        treatment_wells.iter().cloned().collect::<Vec<_>>().join(", ")
    );

    // Step 3: Load annotation and score
    println!("📥 Loading gene annotation: {}", annotation_path.display());
    let annotation = loader::load_gene_annotation(&annotation_path)?;

    println!("\n🔬 Computing differential expression...");
    let genes = analysis::compute_differential_expression(
        &matrix,
        &annotation,
        &treatment_wells,
        &control_wells,
    )?;

    if genes.is_empty() {
        warn!("No landmark genes matched the annotation");
    }
    print_top_genes(&genes, config.report.top_genes);

    // Step 4: Pathway enrichment
    let enrichment = if config.enrichment.enabled {
        let gene_list = analysis::enrichment_gene_list(&genes);
        Some(run_enrichment(&config, &gene_list, args.quiet).await?)
    } else {
        info!("Pathway enrichment disabled");
        None
    };

    // Step 5: Build the report
    println!("\n📝 Generating report...");

    let plots = report::build_plot_data(
        &genes,
        enrichment.as_deref(),
        config.enrichment.top_terms,
    );

    let metadata = build_metadata(
        &args,
        &config,
        &matrix,
        &treatment_wells,
        &control_wells,
        enrichment.is_some(),
        start_time.elapsed().as_secs_f64(),
    );

    let summary = ExpressionSummary::from_scored(&genes);
    let report = Report {
        metadata,
        genes,
        summary: summary.clone(),
        enrichment,
        plots,
        top_genes: config.report.top_genes,
        top_terms: config.enrichment.top_terms,
    };

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, &MarkdownOptions::from(&config.report))
        }
    };

    std::fs::write(&config.general.output, &output)
        .with_context(|| format!("Failed to write report to {}", config.general.output))?;

    if let Some(ref dir) = args.plot_data {
        report::write_plot_data(&report.plots, dir)?;
        println!("   Plot data written to {}", dir.display());
    }

    println!("\n📊 Comparison Summary:");
    println!("   Landmark genes scored: {}", summary.scored);
    println!("   🔴 Up: {} | 🔵 Down: {}", summary.up, summary.down);
    if let Some(ref terms) = report.enrichment {
        println!("   Enriched terms: {}", terms.len());
    }
    println!(
        "   Duration: {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    println!(
        "\n✅ Comparison complete! Report saved to: {}",
        config.general.output
    );

    Ok(())
}

/// Normalize the requested treatment wells, dropping ones absent from the matrix.
fn select_treatment_wells(args: &Args, known_wells: &BTreeSet<String>) -> BTreeSet<String> {
    let mut selected = BTreeSet::new();

    for well in args.treatment_wells() {
        if !known_wells.contains(&well) {
            warn!("Well {} does not occur in the matrix, ignoring", well);
            continue;
        }
        if wells::is_control_well(&well) {
            warn!("Well {} is a control well", well);
        }
        selected.insert(well);
    }

    selected
}

/// Run the Enrichr lookup behind a spinner.
async fn run_enrichment(
    config: &Config,
    gene_list: &[String],
    quiet: bool,
) -> Result<Vec<models::EnrichmentTerm>> {
    println!(
        "\n🧬 Running pathway enrichment for {} genes...",
        gene_list.len()
    );

    let client = EnrichrClient::new(EnrichrConfig::from(&config.enrichment))?;

    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Querying {}", config.enrichment.libraries.join(", ")));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let result = client.enrich(gene_list).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let terms = result.context("Pathway enrichment failed")?;

    println!("   Top enriched pathways:");
    for term in terms.iter().take(config.enrichment.top_terms) {
        let marker = if term.is_significant(config.enrichment.cutoff) {
            "*"
        } else {
            " "
        };
        println!(
            "   {} {} ({}) combined score {:.2}, adjusted p {:.3e}",
            marker, term.term, term.gene_set, term.combined_score, term.adjusted_p_value
        );
    }
    if terms.is_empty() {
        println!("     none returned");
    } else {
        println!("     * adjusted p < {}", config.enrichment.cutoff);
    }

    Ok(terms)
}

fn build_metadata(
    args: &Args,
    config: &Config,
    matrix: &ExpressionMatrix,
    treatment_wells: &BTreeSet<String>,
    control_wells: &BTreeSet<String>,
    enriched: bool,
    duration_seconds: f64,
) -> ReportMetadata {
    ReportMetadata {
        matrix_path: args
            .matrix
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        annotation_path: args
            .gene_info
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        analysis_date: Utc::now(),
        treatment_wells: treatment_wells.iter().cloned().collect(),
        treatment_columns: resolve_columns(matrix, treatment_wells).len(),
        control_columns: resolve_columns(matrix, control_wells).len(),
        matrix_rows: matrix.row_count(),
        libraries: if enriched {
            config.enrichment.libraries.clone()
        } else {
            vec![]
        },
        cutoff: config.enrichment.cutoff,
        duration_seconds,
    }
}

/// Print the selectable wells, marking the reference controls.
fn print_wells(known_wells: &BTreeSet<String>) {
    println!("\n🧫 {} wells in the matrix:\n", known_wells.len());
    for well in known_wells {
        if wells::is_control_well(well) {
            println!("     {} (control)", well);
        } else {
            println!("     {}", well);
        }
    }
}

fn print_top_genes(genes: &[models::ScoredGene], top: usize) {
    println!("\n🏆 Top differentially expressed genes:");
    for gene in analysis::top_genes(genes, top) {
        match gene.diff_expr {
            Some(d) => println!("     {:<12} {:>10.4}", gene.display_name(), d),
            None => println!("     {:<12} {:>10}", gene.display_name(), "n/a"),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so where the settings came from is
/// returned alongside them and logged later.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("Loaded config from {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((
            config,
            format!("Loaded default config from {}", CONFIG_FILE_NAME),
        )),
        Ok(None) => Ok((
            Config::default(),
            "No config file found, using defaults".to_string(),
        )),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), "Using default config".to_string()))
        }
    }
}
