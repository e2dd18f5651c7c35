//! Core data types shared across the scrape-and-publish pipeline.
//!
//! This module defines the records that flow between components:
//! - [`Source`]: a configured news site with a fixed extraction rule
//! - [`CandidateArticle`]: an extracted, not-yet-persisted article
//! - [`Article`]: a persisted article row with per-platform posted flags
//! - [`FacebookPage`] / [`InstagramProfile`]: configured destinations
//! - [`FacebookPost`] / [`InstagramPost`]: durable evidence of one successful
//!   publish of one article to one destination
//!
//! Sources and destinations are admin-managed configuration and read-only to
//! the pipeline; articles are created only by ingestion and their `posted_to_*`
//! flags are mutated only by the publishers (or reset by post-record deletion).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::fmt;

/// The closed set of extractor variants.
///
/// Each configured source is one of a small number of hand-mapped page
/// shapes. Adding a new source site means adding a new variant plus its
/// extractor module, mirroring the fixed nature of the sites themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Elementor-built listing: entries carry a `post-<id>` class and a
    /// `.elementor-post-date` in `dd/mm/YYYY` format; the listing has all
    /// the fields we need.
    Elementor,
    /// DSLC/WordPress theme: the listing only links to articles, so each
    /// entry needs a secondary detail-page fetch. The id is encoded in the
    /// detail page's `postid-<id>` body class and dates are long-form
    /// Spanish ("12 de agosto, 2025").
    Dslc,
    /// Hand-rolled preview boxes: a headline element whose text starts with
    /// a `dd/mm/YYYY` date, followed by a sibling block holding the link
    /// (id in its query string) and the excerpt. No per-article images.
    Preview,
}

/// A configured news site with a fixed extraction rule.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    /// The listing page URL, also used as source attribution in captions.
    pub url: String,
    pub kind: SourceKind,
}

/// A configured Facebook page authorized to receive posts.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookPage {
    pub id: i64,
    pub name: String,
    /// Graph API page id (path segment of the publish endpoint).
    pub page_id: String,
    pub page_token: String,
}

/// A configured Instagram professional profile authorized to receive posts.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramProfile {
    pub id: i64,
    pub name: String,
    /// Graph API Instagram user id (path segment of the publish endpoints).
    pub user_id: String,
    pub user_token: String,
}

/// An extracted, not-yet-persisted article record.
///
/// Extractors emit one of these per listing entry that is dated today and
/// carries every field the pipeline needs; entries missing a field are
/// skipped at extraction time, never half-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateArticle {
    /// Source-scoped external id, derived by a source-specific rule.
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub post_date: NaiveDate,
    pub image: String,
    pub body: String,
}

/// A persisted article row.
///
/// Invariant: `(external_id, source_id)` is unique — the dedup key. Field
/// values are first-write-wins: ingestion never overwrites an existing row.
#[derive(Debug, Clone)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub post_date: NaiveDate,
    pub image: String,
    pub body: String,
    /// Derived cache over facebook post records; the records themselves are
    /// the idempotency source of truth.
    pub posted_to_facebook: bool,
    pub posted_to_instagram: bool,
}

/// Evidence that an article was published to one Facebook page.
#[derive(Debug, Clone)]
pub struct FacebookPost {
    pub id: i64,
    pub article_id: i64,
    pub page_id: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub remote_post_id: Option<String>,
}

/// Evidence that an article was published to one Instagram profile.
#[derive(Debug, Clone)]
pub struct InstagramPost {
    pub id: i64,
    pub article_id: i64,
    pub profile_id: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub remote_post_id: Option<String>,
}

/// Destination platform, used for error reporting and reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Facebook,
    Instagram,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Facebook => write!(f, "facebook"),
            Platform::Instagram => write!(f, "instagram"),
        }
    }
}
