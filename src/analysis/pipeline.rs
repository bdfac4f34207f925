//! Treated vs. control differential expression.
//!
//! Columns are assigned to groups by well suffix, matrix rows are
//! inner-joined with the annotation on gene id, non-landmark genes are
//! dropped, and each surviving gene is scored as
//! `mean(treatment) - mean(control)` over the values that are present.

use crate::error::PipelineError;
use crate::models::{ExpressionMatrix, GeneAnnotation, ScoredGene};
use crate::wells::well_suffix;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Matrix columns resolved for each group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    /// Indices into `ExpressionMatrix::columns`.
    pub treatment: Vec<usize>,
    pub control: Vec<usize>,
}

/// Indices of the columns whose well suffix is in `wells`.
pub fn resolve_columns(matrix: &ExpressionMatrix, wells: &BTreeSet<String>) -> Vec<usize> {
    matrix
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| well_suffix(name).is_some_and(|w| wells.contains(w)))
        .map(|(i, _)| i)
        .collect()
}

/// Resolve both groups, failing when either one is empty.
pub fn select_columns(
    matrix: &ExpressionMatrix,
    treatment_wells: &BTreeSet<String>,
    control_wells: &BTreeSet<String>,
) -> Result<ColumnSelection, PipelineError> {
    if treatment_wells.is_empty() {
        return Err(PipelineError::EmptySelection(
            "no treatment wells selected".to_string(),
        ));
    }

    let overlap: Vec<_> = treatment_wells.intersection(control_wells).collect();
    if !overlap.is_empty() {
        warn!(
            "Wells selected as both treatment and control: {:?}; their columns count in both groups",
            overlap
        );
    }

    let treatment = resolve_columns(matrix, treatment_wells);
    if treatment.is_empty() {
        return Err(PipelineError::EmptySelection(format!(
            "treatment wells {:?} match no matrix columns",
            treatment_wells
        )));
    }

    let control = resolve_columns(matrix, control_wells);
    if control.is_empty() {
        return Err(PipelineError::EmptySelection(
            "no control well columns found in the matrix".to_string(),
        ));
    }

    debug!(
        "Resolved {} treatment and {} control columns",
        treatment.len(),
        control.len()
    );
    Ok(ColumnSelection { treatment, control })
}

/// Mean of the present values at `columns`, `None` if all are missing.
fn group_mean(row: &[Option<f64>], columns: &[usize]) -> Option<f64> {
    let (sum, count) = columns
        .iter()
        .filter_map(|&c| row.get(c).copied().flatten())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Score every landmark gene and rank by `diff_expr`, highest first.
///
/// Rows without an annotation match or whose annotation is not a landmark
/// are dropped. A matrix row matching several annotation rows yields one
/// gene per match. Genes without a score sort last; ties keep matrix order.
pub fn compute_differential_expression(
    matrix: &ExpressionMatrix,
    annotation: &GeneAnnotation,
    treatment_wells: &BTreeSet<String>,
    control_wells: &BTreeSet<String>,
) -> Result<Vec<ScoredGene>, PipelineError> {
    let selection = select_columns(matrix, treatment_wells, control_wells)?;
    let index = annotation.index_by_gene_id();

    let mut scored = Vec::new();
    let mut unmatched = 0usize;

    for (row_id, row) in matrix.row_ids.iter().zip(&matrix.values) {
        let Some(matches) = index.get(row_id.as_str()) else {
            unmatched += 1;
            continue;
        };

        for &a in matches {
            let gene = &annotation.rows[a];
            if !gene.is_landmark {
                continue;
            }

            let treated_mean = group_mean(row, &selection.treatment);
            let control_mean = group_mean(row, &selection.control);
            let diff_expr = match (treated_mean, control_mean) {
                (Some(t), Some(c)) => Some(t - c).filter(|d| !d.is_nan()),
                _ => None,
            };

            scored.push(ScoredGene {
                gene_id: row_id.clone(),
                gene_symbol: gene.gene_symbol.clone(),
                diff_expr,
                treated_mean,
                control_mean,
            });
        }
    }

    rank_by_diff_expr(&mut scored);

    info!(
        "Scored {} landmark genes ({} matrix rows without annotation)",
        scored.len(),
        unmatched
    );
    Ok(scored)
}

/// Stable sort by `diff_expr` descending with unscored genes last.
pub fn rank_by_diff_expr(genes: &mut [ScoredGene]) {
    genes.sort_by(|a, b| match (a.diff_expr, b.diff_expr) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
