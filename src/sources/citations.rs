//! Citation-index collector: per-paper citation counts.

use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::app_err;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

const LOG_TARGET: &str = " citations";
const DEFAULT_BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";

/// Politeness delay between papers.
const PAPER_DELAY: Duration = Duration::from_millis(100);

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "citations.json";

#[derive(Debug, Deserialize)]
struct CitationsResponse {
    #[serde(rename = "hitCount", default)]
    hit_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationPaper {
    pub pmid: String,
    pub citation_count: u64,
}

/// Snapshot record for the citation index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationsData {
    pub papers: Vec<CitationPaper>,
    pub total_citation_count: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    base_url: String,
    now: DateTime<Utc>,
}

impl Provider {
    /// Create a provider. `base_url` overrides the citation index endpoint, for tests.
    pub fn new(base_url: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: crate::sources::base_client()?,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            now,
        })
    }

    /// Look up the citation count of every configured paper and write the snapshot.
    pub async fn collect(&self, papers: &[String], store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting citations");

        let mut records = Vec::with_capacity(papers.len());
        let mut total_citation_count = 0u64;

        for pmid in papers {
            let url = format!("{}/MED/{pmid}/citations?page=1&pageSize=1&format=json", self.base_url);
            let resp = self.client.get(&url).send().await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(app_err!("GET {url} returned HTTP {status}"));
            }

            let citations: CitationsResponse = resp.json().await?;

            records.push(CitationPaper {
                pmid: pmid.clone(),
                citation_count: citations.hit_count,
            });
            total_citation_count += citations.hit_count;

            log::info!(target: LOG_TARGET, "  PMID {pmid}: {} citations", citations.hit_count);
            sleep(PAPER_DELAY).await;
        }

        let data = CitationsData {
            papers: records,
            total_citation_count,
            timestamp: self.now,
        };
        store.save(SNAPSHOT, &data)?;

        log::info!(target: LOG_TARGET, "Total citations: {total_citation_count}");
        Ok(())
    }
}
