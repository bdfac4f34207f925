//! Analysis modules.
//!
//! The pipeline scores and ranks landmark genes; the aggregator derives
//! the display and enrichment views from the ranked list.

pub mod aggregator;
pub mod pipeline;

pub use aggregator::*;
pub use pipeline::compute_differential_expression;
