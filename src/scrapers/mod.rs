//! Per-source article extractors.
//!
//! Each configured source site has a fixed, hand-mapped page shape, so each
//! gets its own extractor module selected by [`SourceKind`]. All extractors
//! implement the same contract: fetch the listing page (plus per-article
//! detail pages where the listing is thin), enumerate entries in listing
//! order, and emit a [`CandidateArticle`] for every entry dated today.
//!
//! | Kind | Module | Id rule | Date rule |
//! |------|--------|---------|-----------|
//! | `elementor` | [`elementor`] | `post-<id>` entry class | `.elementor-post-date`, `dd/mm/YYYY` |
//! | `dslc` | [`dslc`] | `postid-<id>` detail body class | `span.fecha`, "12 de agosto, 2025" |
//! | `preview` | [`preview`] | link query-string tail | first 10 chars of headline, `dd/mm/YYYY` |
//!
//! # Failure policy
//!
//! A malformed entry (missing id, date, or any required field) is logged and
//! skipped; extraction continues with the remaining entries. Sites expose
//! navigation elements matching the same selectors as articles, so requiring
//! the fields is also what filters those out. A listing fetch failure fails
//! the whole source, which the ingestion coordinator isolates from other
//! sources.

pub mod dslc;
pub mod elementor;
pub mod preview;

use crate::models::{CandidateArticle, Source, SourceKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{info, instrument};

/// HTTP seam for extractors, so tests can run against canned documents.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Real fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("fetching {url}: HTTP {status}");
        }
        Ok(response.text().await?)
    }
}

/// Run the extractor matching the source's kind and return today's
/// candidates in listing order, deduplicated by external id (listings
/// sometimes repeat an entry in a highlight strip).
#[instrument(level = "info", skip(fetcher), fields(source = %source.name))]
pub async fn extract(
    source: &Source,
    fetcher: &dyn PageFetcher,
    today: NaiveDate,
) -> Result<Vec<CandidateArticle>> {
    let candidates = match source.kind {
        SourceKind::Elementor => elementor::extract(source, fetcher, today).await?,
        SourceKind::Dslc => dslc::extract(source, fetcher, today).await?,
        SourceKind::Preview => preview::extract(source, fetcher, today).await?,
    };

    let candidates: Vec<CandidateArticle> = candidates
        .into_iter()
        .unique_by(|c| c.external_id.clone())
        .collect();

    info!(count = candidates.len(), "extracted today's candidates");
    Ok(candidates)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::collections::HashMap;

    /// Fetcher serving canned documents keyed by URL.
    pub struct FakeFetcher {
        pages: HashMap<String, String>,
    }

    impl FakeFetcher {
        pub fn new(pages: Vec<(&str, &str)>) -> Self {
            FakeFetcher {
                pages: pages
                    .into_iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no canned page for {url}"))
        }
    }
}
