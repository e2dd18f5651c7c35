//! Ingestion coordinator: one pass over every configured source.
//!
//! Runs the matching extractor per source, funnels candidates through the
//! store's get-or-create dedup, and reports how many articles this pass
//! actually created. A source whose listing is unreachable (or whose
//! extraction fails outright) is logged and skipped; the remaining sources
//! are always processed, so the pass always reports.

use crate::models::Source;
use crate::scrapers::{self, PageFetcher};
use crate::store::Store;
use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

/// Ingest today's articles from all sources, returning the created count.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), %today))]
pub async fn run_ingestion(
    store: &Store,
    fetcher: &dyn PageFetcher,
    sources: &[Source],
    today: NaiveDate,
) -> usize {
    let mut total_created = 0usize;

    for source in sources {
        let candidates = match scrapers::extract(source, fetcher, today).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(source = %source.name, error = %e, "source extraction failed; continuing with the rest");
                continue;
            }
        };

        for candidate in candidates {
            match store.get_or_create_article(source.id, &candidate) {
                Ok((_, true)) => total_created += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    warn!(
                        source = %source.name,
                        external_id = %candidate.external_id,
                        error = %e,
                        "failed to persist candidate; skipping"
                    );
                }
            }
        }
    }

    info!(created = total_created, "ingestion pass complete");
    total_created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use crate::scrapers::testutil::FakeFetcher;

    fn entry(id: u32, date: &str) -> String {
        format!(
            r#"<article class="post-{id}">
                 <a class="elementor-post__thumbnail__link" href="https://site.example/nota-{id}">
                   <img src="https://site.example/{id}.jpg">
                 </a>
                 <h3>Headline {id}</h3>
                 <span class="elementor-post-date">{date}</span>
                 <p>Excerpt {id}</p>
               </article>"#
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn elementor_source() -> Source {
        Source {
            id: 1,
            name: "Elementor".to_string(),
            url: "https://site.example/".to_string(),
            kind: SourceKind::Elementor,
        }
    }

    #[tokio::test]
    async fn second_run_over_unchanged_listing_creates_nothing() {
        // Three entries, two dated today.
        let listing = format!(
            "{}{}{}",
            entry(1, "30/08/2026"),
            entry(2, "29/08/2026"),
            entry(3, "30/08/2026"),
        );
        let fetcher = FakeFetcher::new(vec![("https://site.example/", listing.as_str())]);
        let store = Store::open_in_memory().unwrap();
        let sources = vec![elementor_source()];

        let created = run_ingestion(&store, &fetcher, &sources, today()).await;
        assert_eq!(created, 2);

        let created = run_ingestion(&store, &fetcher, &sources, today()).await;
        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn unreachable_source_does_not_stop_the_others() {
        let listing = entry(9, "30/08/2026");
        // Only the second source has a canned listing.
        let fetcher = FakeFetcher::new(vec![("https://site.example/", listing.as_str())]);
        let store = Store::open_in_memory().unwrap();
        let sources = vec![
            Source {
                id: 5,
                name: "Down".to_string(),
                url: "https://down.example/".to_string(),
                kind: SourceKind::Elementor,
            },
            elementor_source(),
        ];

        let created = run_ingestion(&store, &fetcher, &sources, today()).await;
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn repeated_listing_entry_is_stored_once() {
        // Highlight strip repeats article 4.
        let listing = format!("{}{}", entry(4, "30/08/2026"), entry(4, "30/08/2026"));
        let fetcher = FakeFetcher::new(vec![("https://site.example/", listing.as_str())]);
        let store = Store::open_in_memory().unwrap();

        let created = run_ingestion(&store, &fetcher, &[elementor_source()], today()).await;
        assert_eq!(created, 1);
    }
}
