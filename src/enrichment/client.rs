//! Enrichr API client.
//!
//! A gene list is registered with `POST /addList`, then each gene-set
//! library is queried with `GET /enrich`. Every term is returned, in the
//! service's rank order, with libraries concatenated in the configured
//! order. The adjusted p-value cutoff only marks terms as significant.

use crate::error::EnrichmentError;
use crate::models::EnrichmentTerm;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the enrichment client.
#[derive(Debug, Clone)]
pub struct EnrichrConfig {
    pub base_url: String,
    pub libraries: Vec<String>,
    /// Adjusted p-value below which a term counts as significant.
    pub cutoff: f64,
    pub timeout_seconds: u64,
    /// Description attached to the uploaded gene list.
    pub description: String,
}

impl Default for EnrichrConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maayanlab.cloud/Enrichr".to_string(),
            libraries: vec![
                "KEGG_2019_Human".to_string(),
                "GO_Biological_Process_2021".to_string(),
            ],
            cutoff: 0.05,
            timeout_seconds: 300,
            description: "wellcontrast landmark genes".to_string(),
        }
    }
}

/// Client for the Enrichr web service.
pub struct EnrichrClient {
    config: EnrichrConfig,
    http_client: reqwest::Client,
}

impl EnrichrClient {
    /// Create a new client.
    pub fn new(config: EnrichrConfig) -> Result<Self, EnrichmentError> {
        info!(
            "Initializing Enrichr client at {} for libraries {:?}",
            config.base_url, config.libraries
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Run the enrichment lookup for a gene list.
    pub async fn enrich(&self, genes: &[String]) -> Result<Vec<EnrichmentTerm>, EnrichmentError> {
        if genes.is_empty() {
            warn!("Empty gene list, skipping enrichment");
            return Ok(vec![]);
        }

        let user_list_id = self.add_list(genes).await?;
        info!("Registered {} genes as list {}", genes.len(), user_list_id);

        let mut terms = Vec::new();
        for library in &self.config.libraries {
            let library_terms = self.enrich_library(user_list_id, library).await?;
            debug!("{}: {} terms", library, library_terms.len());
            terms.extend(library_terms);
        }

        info!(
            "{} ranked terms, {} below adjusted p-value {}",
            terms.len(),
            terms
                .iter()
                .filter(|t| t.is_significant(self.config.cutoff))
                .count(),
            self.config.cutoff
        );
        Ok(terms)
    }

    /// Upload the gene list and return its id.
    async fn add_list(&self, genes: &[String]) -> Result<u64, EnrichmentError> {
        let url = self.endpoint("addList");

        let form = reqwest::multipart::Form::new()
            .text("list", genes.join("\n"))
            .text("description", self.config.description.clone());

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let body = self.read_json(response).await?;
        parse_add_list_response(&body)
    }

    /// Query one library for the registered list.
    async fn enrich_library(
        &self,
        user_list_id: u64,
        library: &str,
    ) -> Result<Vec<EnrichmentTerm>, EnrichmentError> {
        let url = self.endpoint("enrich");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("userListId", user_list_id.to_string()),
                ("backgroundType", library.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let body = self.read_json(response).await?;
        parse_library_terms(library, &body)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn send_error(&self, e: reqwest::Error) -> EnrichmentError {
        if e.is_timeout() {
            EnrichmentError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            EnrichmentError::Connect(self.config.base_url.clone())
        } else {
            EnrichmentError::Request(e)
        }
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, EnrichmentError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Status { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EnrichmentError::Malformed(e.to_string()))
    }
}

/// Extract `userListId` from an `addList` response.
pub fn parse_add_list_response(body: &Value) -> Result<u64, EnrichmentError> {
    body["userListId"]
        .as_u64()
        .ok_or_else(|| EnrichmentError::Malformed(format!("no userListId in {}", body)))
}

/// Parse the rows of an `enrich` response for `library`.
///
/// Each row is `[rank, term, p, odds_ratio, combined_score, [genes], adj_p, ...]`.
pub fn parse_library_terms(
    library: &str,
    body: &Value,
) -> Result<Vec<EnrichmentTerm>, EnrichmentError> {
    let rows = body[library].as_array().ok_or_else(|| {
        EnrichmentError::Malformed(format!("no results for library {}", library))
    })?;

    rows.iter()
        .map(|row| parse_term_row(library, row))
        .collect()
}

fn parse_term_row(library: &str, row: &Value) -> Result<EnrichmentTerm, EnrichmentError> {
    let malformed = || EnrichmentError::Malformed(format!("bad {} row: {}", library, row));
    let number = |i: usize| row[i].as_f64().ok_or_else(malformed);

    Ok(EnrichmentTerm {
        gene_set: library.to_string(),
        rank: row[0].as_u64().ok_or_else(malformed)? as u32,
        term: row[1].as_str().ok_or_else(malformed)?.to_string(),
        p_value: number(2)?,
        odds_ratio: number(3)?,
        combined_score: number(4)?,
        genes: row[5]
            .as_array()
            .ok_or_else(malformed)?
            .iter()
            .filter_map(|g| g.as_str().map(String::from))
            .collect(),
        adjusted_p_value: number(6)?,
    })
}
