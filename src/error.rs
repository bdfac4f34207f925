//! Error types for the pipeline and the enrichment client.

use thiserror::Error;

/// Failures of loading or comparing the input tables.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input table is malformed or lacks a required column.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// Nothing to compare: no wells selected or no columns resolved.
    #[error("Empty selection: {0}")]
    EmptySelection(String),
}

/// Failures of the remote enrichment lookup.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Cannot connect to enrichment service at {0}")]
    Connect(String),

    #[error("Enrichment request timed out after {0}s")]
    Timeout(u64),

    #[error("Enrichment service error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed enrichment response: {0}")]
    Malformed(String),

    #[error("Enrichment request failed: {0}")]
    Request(#[from] reqwest::Error),
}
