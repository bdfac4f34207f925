//! Pathway enrichment lookup.
//!
//! This module talks to the Enrichr web service for the ranked gene list.

pub mod client;

pub use client::{EnrichrClient, EnrichrConfig};
