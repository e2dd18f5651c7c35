//! Extractor for the Elementor-built source.
//!
//! The listing page carries everything we need, one `<article>` element per
//! entry. The external id is encoded in the entry's `post-<id>` class and
//! the publication date sits in `.elementor-post-date` as `dd/mm/YYYY`.

use crate::models::{CandidateArticle, Source};
use crate::scrapers::PageFetcher;
use anyhow::Result;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

pub async fn extract(
    source: &Source,
    fetcher: &dyn PageFetcher,
    today: NaiveDate,
) -> Result<Vec<CandidateArticle>> {
    let html = fetcher.fetch(&source.url).await?;
    Ok(parse_listing(&html, today))
}

fn parse_listing(html: &str, today: NaiveDate) -> Vec<CandidateArticle> {
    let document = Html::parse_document(html);
    let entry_selector = Selector::parse("article").unwrap();

    let mut candidates = Vec::new();
    for entry in document.select(&entry_selector) {
        // The theme reuses <article> for navigation widgets; anything
        // without an id class and a parseable date is not an article.
        let Some((external_id, post_date)) = entry_identity(entry) else {
            debug!("skipping entry without id/date");
            continue;
        };
        if post_date != today {
            continue;
        }
        match entry_fields(entry) {
            Some((url, title, image, body)) => candidates.push(CandidateArticle {
                external_id,
                url,
                title,
                post_date,
                image,
                body,
            }),
            None => warn!(external_id = %external_id, "entry dated today is missing a required field; skipping"),
        }
    }
    candidates
}

fn entry_identity(entry: ElementRef<'_>) -> Option<(String, NaiveDate)> {
    let external_id = entry
        .value()
        .classes()
        .find(|class| class.starts_with("post-"))
        .map(|class| class["post-".len()..].to_string())?;

    let date_selector = Selector::parse(".elementor-post-date").unwrap();
    let date_text = entry
        .select(&date_selector)
        .next()
        .map(|el| el.text().collect::<String>())?;
    let post_date = NaiveDate::parse_from_str(date_text.trim(), "%d/%m/%Y").ok()?;

    Some((external_id, post_date))
}

fn entry_fields(entry: ElementRef<'_>) -> Option<(String, String, String, String)> {
    let link_selector = Selector::parse(".elementor-post__thumbnail__link").unwrap();
    let title_selector = Selector::parse("h3").unwrap();
    let image_selector = Selector::parse("img").unwrap();
    let body_selector = Selector::parse("p").unwrap();

    let url = entry
        .select(&link_selector)
        .next()
        .and_then(|el| el.value().attr("href"))?
        .to_string();
    let title = entry
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())?;
    let image = entry
        .select(&image_selector)
        .next()
        .and_then(|el| el.value().attr("src"))?
        .to_string();
    let body = entry
        .select(&body_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())?;

    Some((url, title, image, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, date: &str) -> String {
        format!(
            r#"<article class="elementor-post post-{id}">
                 <a class="elementor-post__thumbnail__link" href="https://site.example/nota-{id}">
                   <img src="https://site.example/{id}.jpg">
                 </a>
                 <h3> Headline {id} </h3>
                 <span class="elementor-post-date"> {date} </span>
                 <p>Excerpt {id}</p>
               </article>"#
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    #[test]
    fn keeps_only_entries_dated_today() {
        let html = format!(
            "{}{}{}",
            entry(101, "30/08/2026"),
            entry(102, "29/08/2026"),
            entry(103, "30/08/2026"),
        );
        let candidates = parse_listing(&html, today());

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].external_id, "101");
        assert_eq!(candidates[1].external_id, "103");
        assert_eq!(candidates[0].url, "https://site.example/nota-101");
        assert_eq!(candidates[0].title, "Headline 101");
        assert_eq!(candidates[0].image, "https://site.example/101.jpg");
        assert_eq!(candidates[0].body, "Excerpt 101");
        assert_eq!(candidates[0].post_date, today());
    }

    #[test]
    fn navigation_articles_without_id_or_date_are_ignored() {
        let html = format!(
            r#"<article class="site-nav"><a href="/archive">Archive</a></article>{}"#,
            entry(7, "30/08/2026"),
        );
        let candidates = parse_listing(&html, today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "7");
    }

    #[test]
    fn malformed_entry_does_not_abort_the_rest() {
        // Dated today but missing the headline: skipped, neighbors survive.
        let broken = r#"<article class="post-500">
                          <a class="elementor-post__thumbnail__link" href="https://site.example/x">
                            <img src="https://site.example/x.jpg">
                          </a>
                          <span class="elementor-post-date">30/08/2026</span>
                          <p>Excerpt</p>
                        </article>"#;
        let html = format!("{}{}", broken, entry(501, "30/08/2026"));
        let candidates = parse_listing(&html, today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "501");
    }
}
