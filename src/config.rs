//! Runtime configuration loaded from a JSON file.
//!
//! The config file is the admin surface for sources and destinations: the
//! pipeline only ever reads them. Tokens live here too, so the file should
//! be chmod'd accordingly.
//!
//! ```json
//! {
//!   "database": "paperboy.db",
//!   "caption_footer": "Follow us on FM 106.9",
//!   "sources": [
//!     { "id": 1, "name": "El Diario", "url": "https://eldiario.example/noticias", "kind": "elementor" }
//!   ],
//!   "facebook_pages": [
//!     { "id": 1, "name": "Main page", "page_id": "1015551234", "page_token": "EAAB..." }
//!   ],
//!   "instagram_profiles": [
//!     { "id": 1, "name": "Main profile", "user_id": "1784401234", "user_token": "IGQV..." }
//!   ]
//! }
//! ```

use crate::models::{FacebookPage, InstagramProfile, Source};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// SQLite database path.
    #[serde(default = "default_database")]
    pub database: String,
    /// Graph API base URL. Overridable so a staging mock can stand in.
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,
    /// Call-to-action text appended to every caption.
    #[serde(default)]
    pub caption_footer: String,
    pub sources: Vec<Source>,
    #[serde(default)]
    pub facebook_pages: Vec<FacebookPage>,
    #[serde(default)]
    pub instagram_profiles: Vec<InstagramProfile>,
    #[serde(default)]
    pub schedule: Schedule,
}

/// Recurring schedule for the `run` daemon.
///
/// Ingestion and the sweeper run on independent intervals; the sweep is
/// offset from startup so freshly ingested articles have time to settle.
#[derive(Debug, Clone, Deserialize)]
pub struct Schedule {
    #[serde(default = "default_ingest_minutes")]
    pub ingest_every_minutes: u64,
    #[serde(default = "default_sweep_minutes")]
    pub sweep_every_minutes: u64,
    #[serde(default = "default_sweep_offset")]
    pub sweep_offset_minutes: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            ingest_every_minutes: default_ingest_minutes(),
            sweep_every_minutes: default_sweep_minutes(),
            sweep_offset_minutes: default_sweep_offset(),
        }
    }
}

fn default_database() -> String {
    "paperboy.db".to_string()
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_ingest_minutes() -> u64 {
    240
}

fn default_sweep_minutes() -> u64 {
    240
}

fn default_sweep_offset() -> u64 {
    30
}

impl Config {
    pub fn source(&self, id: i64) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }
}

pub fn load(path: &str) -> Result<Config> {
    let text = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
    let config: Config =
        serde_json::from_str(&text).with_context(|| format!("parsing config {path}"))?;
    Ok(config)
}
