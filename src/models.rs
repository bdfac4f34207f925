//! Data models for the expression comparison.
//!
//! This module contains the core data structures used throughout
//! the application for representing the input tables, scored genes,
//! enrichment terms, and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name of the gene id column in the expression matrix.
pub const MATRIX_ID_COLUMN: &str = "rid";

/// Join key column of the gene annotation table.
pub const ANNOTATION_ID_COLUMN: &str = "pr_gene_id";

/// Display name column of the gene annotation table.
pub const ANNOTATION_SYMBOL_COLUMN: &str = "pr_gene_symbol";

/// Landmark flag column of the gene annotation table.
pub const ANNOTATION_LANDMARK_COLUMN: &str = "pr_is_lm";

/// Expression values keyed by gene row id and sample column.
///
/// `columns` holds the sample column names (the id column is not part of
/// it); `values[r][c]` is the cell for `row_ids[r]` and `columns[c]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionMatrix {
    pub row_ids: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl ExpressionMatrix {
    /// Number of gene rows.
    pub fn row_count(&self) -> usize {
        self.row_ids.len()
    }
}

/// One row of the gene annotation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRow {
    /// Canonical gene id (join key).
    pub gene_id: String,
    /// Human-readable gene symbol, if present.
    pub gene_symbol: Option<String>,
    /// Whether the gene belongs to the landmark panel.
    pub is_landmark: bool,
}

/// Gene annotation table, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneAnnotation {
    pub rows: Vec<AnnotationRow>,
}

impl GeneAnnotation {
    /// Map from gene id to the indices of all annotation rows carrying it.
    pub fn index_by_gene_id(&self) -> HashMap<&str, Vec<usize>> {
        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            index.entry(row.gene_id.as_str()).or_default().push(i);
        }
        index
    }

    /// Number of landmark rows.
    pub fn landmark_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_landmark).count()
    }
}

/// Canonicalize a gene identifier so that integer-like ids compare equal
/// regardless of padding or a trailing `.0`.
pub fn canonical_gene_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n.to_string();
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return (f as i64).to_string();
        }
    }
    trimmed.to_string()
}

/// A landmark gene with its treated vs. control score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGene {
    pub gene_id: String,
    pub gene_symbol: Option<String>,
    /// `treated_mean - control_mean`; `None` when either group had no values.
    pub diff_expr: Option<f64>,
    pub treated_mean: Option<f64>,
    pub control_mean: Option<f64>,
}

impl ScoredGene {
    /// Symbol for display, falling back to the gene id.
    pub fn display_name(&self) -> &str {
        self.gene_symbol.as_deref().unwrap_or(&self.gene_id)
    }

    /// Direction of the score.
    pub fn regulation(&self) -> Regulation {
        match self.diff_expr {
            Some(d) if d > 0.0 => Regulation::Up,
            Some(d) if d < 0.0 => Regulation::Down,
            Some(_) => Regulation::Unchanged,
            None => Regulation::Unscored,
        }
    }
}

/// Direction of differential expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regulation {
    Up,
    Down,
    Unchanged,
    Unscored,
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regulation::Up => write!(f, "Up"),
            Regulation::Down => write!(f, "Down"),
            Regulation::Unchanged => write!(f, "Unchanged"),
            Regulation::Unscored => write!(f, "Unscored"),
        }
    }
}

impl Regulation {
    /// Returns an emoji representation of the direction.
    pub fn emoji(&self) -> &'static str {
        match self {
            Regulation::Up => "🔴",
            Regulation::Down => "🔵",
            Regulation::Unchanged => "⚪",
            Regulation::Unscored => "➖",
        }
    }
}

/// One enriched pathway term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentTerm {
    /// Gene-set library the term comes from.
    pub gene_set: String,
    /// Rank reported by the service within its library.
    pub rank: u32,
    pub term: String,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub odds_ratio: f64,
    pub combined_score: f64,
    /// Input genes overlapping the term.
    pub genes: Vec<String>,
}

impl EnrichmentTerm {
    /// Whether the adjusted p-value is below `cutoff`.
    pub fn is_significant(&self, cutoff: f64) -> bool {
        self.adjusted_p_value < cutoff
    }
}

/// Summary statistics over scored genes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSummary {
    /// Number of genes in the ranked output.
    pub total: usize,
    /// Genes with a defined score.
    pub scored: usize,
    /// Genes without a score.
    pub unscored: usize,
    /// Genes with a positive score.
    pub up: usize,
    /// Genes with a negative score.
    pub down: usize,
    pub max_diff: Option<f64>,
    pub min_diff: Option<f64>,
    /// Mean of `|diff_expr|` over scored genes.
    pub mean_abs_diff: Option<f64>,
}

impl ExpressionSummary {
    /// Creates a summary from a list of scored genes.
    pub fn from_scored(genes: &[ScoredGene]) -> Self {
        let mut summary = Self {
            total: genes.len(),
            ..Self::default()
        };
        let mut abs_sum = 0.0;

        for gene in genes {
            match gene.regulation() {
                Regulation::Up => summary.up += 1,
                Regulation::Down => summary.down += 1,
                Regulation::Unchanged => {}
                Regulation::Unscored => {
                    summary.unscored += 1;
                    continue;
                }
            }

            if let Some(d) = gene.diff_expr {
                summary.scored += 1;
                abs_sum += d.abs();
                summary.max_diff = Some(summary.max_diff.map_or(d, |m| m.max(d)));
                summary.min_diff = Some(summary.min_diff.map_or(d, |m| m.min(d)));
            }
        }

        if summary.scored > 0 {
            summary.mean_abs_diff = Some(abs_sum / summary.scored as f64);
        }

        summary
    }
}

/// Metadata about the comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the expression matrix.
    pub matrix_path: String,
    /// Path of the gene annotation table.
    pub annotation_path: String,
    /// Date and time of the run.
    pub analysis_date: DateTime<Utc>,
    /// Treatment wells that resolved to matrix columns.
    pub treatment_wells: Vec<String>,
    /// Number of treatment columns used.
    pub treatment_columns: usize,
    /// Number of control columns used.
    pub control_columns: usize,
    /// Gene rows in the matrix.
    pub matrix_rows: usize,
    /// Gene-set libraries queried, empty when enrichment was skipped.
    pub libraries: Vec<String>,
    /// Adjusted p-value cutoff applied to enrichment terms.
    pub cutoff: f64,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Plot-ready data derived from the ranked genes and enrichment terms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotData {
    pub volcano: Vec<VolcanoPoint>,
    pub pathways: Vec<PathwayBar>,
}

/// A point of the volcano-style scatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolcanoPoint {
    pub gene_symbol: String,
    /// Differential expression (treated - control).
    pub x: f64,
    /// `|diff_expr|`.
    pub y: f64,
    pub up: bool,
}

/// A bar of the pathway chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayBar {
    pub term: String,
    pub combined_score: f64,
}

/// The complete comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// All landmark genes, ranked by score.
    pub genes: Vec<ScoredGene>,
    pub summary: ExpressionSummary,
    /// Enrichment terms passing the cutoff, `None` when enrichment was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Vec<EnrichmentTerm>>,
    pub plots: PlotData,
    /// How many genes and terms the rendered report shows.
    pub top_genes: usize,
    pub top_terms: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene(id: &str, diff: Option<f64>) -> ScoredGene {
        ScoredGene {
            gene_id: id.to_string(),
            gene_symbol: Some(format!("G{}", id)),
            diff_expr: diff,
            treated_mean: None,
            control_mean: None,
        }
    }

    #[test]
    fn test_canonical_gene_id() {
        assert_eq!(canonical_gene_id("12"), "12");
        assert_eq!(canonical_gene_id(" 0012 "), "12");
        assert_eq!(canonical_gene_id("12.0"), "12");
        assert_eq!(canonical_gene_id("12.5"), "12.5");
        assert_eq!(canonical_gene_id("ENSG0001"), "ENSG0001");
    }

    #[test]
    fn test_regulation() {
        assert_eq!(gene("1", Some(1.5)).regulation(), Regulation::Up);
        assert_eq!(gene("1", Some(-0.1)).regulation(), Regulation::Down);
        assert_eq!(gene("1", Some(0.0)).regulation(), Regulation::Unchanged);
        assert_eq!(gene("1", None).regulation(), Regulation::Unscored);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut g = gene("7", Some(1.0));
        assert_eq!(g.display_name(), "G7");
        g.gene_symbol = None;
        assert_eq!(g.display_name(), "7");
    }

    #[test]
    fn test_annotation_index_keeps_duplicates() {
        let annotation = GeneAnnotation {
            rows: vec![
                AnnotationRow {
                    gene_id: "1".to_string(),
                    gene_symbol: Some("A".to_string()),
                    is_landmark: true,
                },
                AnnotationRow {
                    gene_id: "2".to_string(),
                    gene_symbol: None,
                    is_landmark: false,
                },
                AnnotationRow {
                    gene_id: "1".to_string(),
                    gene_symbol: Some("A2".to_string()),
                    is_landmark: true,
                },
            ],
        };
        let index = annotation.index_by_gene_id();
        assert_eq!(index.get("1"), Some(&vec![0, 2]));
        assert_eq!(index.get("2"), Some(&vec![1]));
        assert_eq!(annotation.landmark_count(), 2);
    }

    #[test]
    fn test_expression_summary() {
        let genes = vec![
            gene("1", Some(3.0)),
            gene("2", Some(-1.0)),
            gene("3", Some(0.0)),
            gene("4", None),
        ];

        let summary = ExpressionSummary::from_scored(&genes);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.scored, 3);
        assert_eq!(summary.unscored, 1);
        assert_eq!(summary.up, 1);
        assert_eq!(summary.down, 1);
        assert_eq!(summary.max_diff, Some(3.0));
        assert_eq!(summary.min_diff, Some(-1.0));
        assert_eq!(summary.mean_abs_diff, Some(4.0 / 3.0));
    }

    #[test]
    fn test_expression_summary_empty() {
        let summary = ExpressionSummary::from_scored(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.max_diff.is_none());
        assert!(summary.mean_abs_diff.is_none());
    }
}
