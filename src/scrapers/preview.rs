//! Extractor for the hand-rolled preview-box source.
//!
//! The site renders each article as a pair of elements: a headline whose
//! text starts with a `dd/mm/YYYY` date, then a sibling block with the link
//! and excerpt. The external id is the tail of the link's query string
//! (`?p=<id>`), links are site-relative, and the site publishes no
//! per-article images, so candidates carry the site's branding card.

use crate::models::{CandidateArticle, Source};
use crate::scrapers::PageFetcher;
use anyhow::Result;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

/// Shown on posts because the source has no article imagery.
const BRANDING_IMAGE: &str = "https://i.postimg.cc/Y0q3C1yH/preview-news-card.png";

/// The headline text is `dd/mm/YYYY - Title`; the date is the first 10
/// characters and the title starts after the separator.
const TITLE_PREFIX_CHARS: usize = 13;

pub async fn extract(
    source: &Source,
    fetcher: &dyn PageFetcher,
    today: NaiveDate,
) -> Result<Vec<CandidateArticle>> {
    let html = fetcher.fetch(&source.url).await?;
    let base = Url::parse(&source.url)?;
    Ok(parse_listing(&html, &base, today))
}

fn parse_listing(html: &str, base: &Url, today: NaiveDate) -> Vec<CandidateArticle> {
    let document = Html::parse_document(html);
    let headline_selector = Selector::parse(".titulopreviewnoticia").unwrap();

    let mut candidates = Vec::new();
    for headline in document.select(&headline_selector) {
        let text = headline.text().collect::<String>();
        let date_part: String = text.trim_start().chars().take(10).collect();
        let Ok(post_date) = NaiveDate::parse_from_str(&date_part, "%d/%m/%Y") else {
            warn!(snippet = %date_part, "headline without leading date; skipping");
            continue;
        };
        if post_date != today {
            continue;
        }

        let title: String = text.trim_start().chars().skip(TITLE_PREFIX_CHARS).collect();
        let title = title.trim().to_string();

        // The excerpt block is the next element sibling of the headline.
        let Some(block) = headline.next_siblings().filter_map(ElementRef::wrap).next() else {
            warn!(%title, "headline without excerpt block; skipping");
            continue;
        };
        match block_fields(block, base) {
            Some((external_id, url, body)) => candidates.push(CandidateArticle {
                external_id,
                url,
                title,
                post_date,
                image: BRANDING_IMAGE.to_string(),
                body,
            }),
            None => warn!(%title, "excerpt block missing link or body; skipping"),
        }
    }
    candidates
}

fn block_fields(block: ElementRef<'_>, base: &Url) -> Option<(String, String, String)> {
    let link_selector = Selector::parse(".linkpreviewnoticia a").unwrap();
    let body_selector = Selector::parse(".descripcionpreviewnoticia p").unwrap();

    let href = block
        .select(&link_selector)
        .next()
        .and_then(|el| el.value().attr("href"))?;
    let external_id = href.rsplit('=').next()?.to_string();
    let url = base.join(href).ok()?.to_string();
    let body = block
        .select(&body_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())?;

    Some((external_id, url, body))
}
