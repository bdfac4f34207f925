//! Views over ranked genes.
//!
//! This module provides utilities for slicing the ranked gene list into
//! what the report shows and what the enrichment lookup receives.

use crate::models::ScoredGene;

/// The first `n` genes of the ranking.
pub fn top_genes(genes: &[ScoredGene], n: usize) -> &[ScoredGene] {
    &genes[..n.min(genes.len())]
}

/// The `n` most down-regulated scored genes, most negative first.
pub fn bottom_genes(genes: &[ScoredGene], n: usize) -> Vec<&ScoredGene> {
    genes
        .iter()
        .rev()
        .filter(|g| g.diff_expr.is_some())
        .take(n)
        .collect()
}

/// Gene symbols in ranked order, skipping genes without a symbol.
pub fn enrichment_gene_list(genes: &[ScoredGene]) -> Vec<String> {
    genes.iter().filter_map(|g| g.gene_symbol.clone()).collect()
}
