//! Markdown report generation.
//!
//! This module generates the comparison report from the ranked genes,
//! the enrichment terms, and the plot data.

use crate::analysis::{bottom_genes, top_genes};
use crate::models::{EnrichmentTerm, ExpressionSummary, Report, ReportMetadata, ScoredGene};
use crate::report::plots::{render_bar_chart, render_volcano};
use anyhow::Result;

/// Rendering options for the Markdown report.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    pub include_volcano: bool,
    pub include_pathway_chart: bool,
    /// Character width of the text charts.
    pub chart_width: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            include_volcano: true,
            include_pathway_chart: true,
            chart_width: 60,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &MarkdownOptions) -> String {
    let mut output = String::new();

    output.push_str("# Differential Expression Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_summary_section(&report.summary));

    output.push_str(&generate_genes_section(&report.genes, report.top_genes));

    if options.include_volcano {
        output.push_str(&generate_volcano_section(report, options.chart_width));
    }

    output.push_str(&generate_enrichment_section(
        report.enrichment.as_deref(),
        report.top_terms,
        report.metadata.cutoff,
    ));

    if options.include_pathway_chart && !report.plots.pathways.is_empty() {
        output.push_str("## Top Pathways Bar Plot\n\n```text\n");
        output.push_str(&render_bar_chart(
            &report.plots.pathways,
            options.chart_width / 2,
        ));
        output.push_str("```\n\n");
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Expression Matrix:** `{}`\n", metadata.matrix_path));
    section.push_str(&format!(
        "- **Gene Annotation:** `{}`\n",
        metadata.annotation_path
    ));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Treatment Wells:** {}\n",
        metadata.treatment_wells.join(", ")
    ));
    section.push_str(&format!(
        "- **Columns:** {} treatment, {} control\n",
        metadata.treatment_columns, metadata.control_columns
    ));
    section.push_str(&format!("- **Matrix Genes:** {}\n", metadata.matrix_rows));
    if !metadata.libraries.is_empty() {
        section.push_str(&format!(
            "- **Gene-Set Libraries:** {} (adjusted p < {})\n",
            metadata.libraries.join(", "),
            metadata.cutoff
        ));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Escape a value for use inside a Markdown table cell.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn format_diff(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

/// Generate the summary section.
fn generate_summary_section(summary: &ExpressionSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Landmark Genes | Scored | 🔴 Up | 🔵 Down | Unscored |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | {} | {} | {} | {} |\n\n",
        summary.total, summary.scored, summary.up, summary.down, summary.unscored
    ));

    if summary.scored > 0 {
        section.push_str(&format!(
            "Range {} to {}, mean |diff| {}.\n\n",
            format_diff(summary.min_diff),
            format_diff(summary.max_diff),
            format_diff(summary.mean_abs_diff)
        ));
    }

    section
}

/// Generate the ranked genes section.
fn generate_genes_section(genes: &[ScoredGene], top: usize) -> String {
    let mut section = String::new();

    section.push_str("## Top Differentially Expressed Genes\n\n");

    if genes.is_empty() {
        section.push_str("No landmark genes matched the annotation.\n\n");
        return section;
    }

    section.push_str(&generate_gene_table(top_genes(genes, top)));

    let rest = &genes[top.min(genes.len())..];
    let bottom = bottom_genes(rest, top.min(10));
    if !bottom.is_empty() {
        section.push_str("### Most Down-regulated\n\n");
        section.push_str(&generate_gene_table(bottom));
    }

    section
}

fn generate_gene_table<'a>(genes: impl IntoIterator<Item = &'a ScoredGene>) -> String {
    let mut table = String::new();

    table.push_str("| | pr_gene_symbol | diff_expr |\n");
    table.push_str("|:---:|:---|---:|\n");
    for gene in genes {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            gene.regulation().emoji(),
            escape_cell(gene.display_name()),
            format_diff(gene.diff_expr)
        ));
    }
    table.push('\n');

    table
}

/// Generate the volcano plot section.
fn generate_volcano_section(report: &Report, width: usize) -> String {
    if report.plots.volcano.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Volcano Plot\n\n");
    section.push_str("x: differential expression (treated - control), y: |differential expression|\n\n");
    section.push_str("```text\n");
    section.push_str(&render_volcano(&report.plots.volcano, width, width / 4));
    section.push_str("```\n\n");

    section
}

/// Generate the enrichment section. Terms below `cutoff` are marked ✅.
fn generate_enrichment_section(
    terms: Option<&[EnrichmentTerm]>,
    top: usize,
    cutoff: f64,
) -> String {
    let Some(terms) = terms else {
        return String::new();
    };

    let mut section = String::new();

    section.push_str("## Top Pathway Enrichment Results\n\n");

    if terms.is_empty() {
        section.push_str("The enrichment service returned no terms.\n\n");
        return section;
    }

    section.push_str(
        "| Gene_set | Term | Adjusted P-value | Combined Score | Genes | Significant |\n",
    );
    section.push_str("|:---|:---|---:|---:|:---|:---:|\n");
    for term in terms.iter().take(top) {
        section.push_str(&format!(
            "| {} | {} | {:.3e} | {:.2} | {} | {} |\n",
            escape_cell(&term.gene_set),
            escape_cell(&term.term),
            term.adjusted_p_value,
            term.combined_score,
            escape_cell(&term.genes.join(";")),
            if term.is_significant(cutoff) { "✅" } else { "" }
        ));
    }
    section.push('\n');

    let significant = terms.iter().filter(|t| t.is_significant(cutoff)).count();
    section.push_str(&format!(
        "{} of {} terms have adjusted p < {}.\n\n",
        significant,
        terms.len(),
        cutoff
    ));

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by wellcontrast v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
