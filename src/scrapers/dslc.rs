//! Extractor for the DSLC-themed WordPress source.
//!
//! The listing page only links to articles, so every entry costs a second
//! fetch. All fields come from the detail page: the external id from the
//! `postid-<id>` body class, the date from `span.fecha` in long-form
//! Spanish ("12 de agosto, 2025"), the image from the post thumbnail's
//! `data-src` (the theme lazy-loads, `src` is a placeholder).
//!
//! A detail page that fails to fetch or parse is skipped with a warning;
//! the remaining entries still go through.

use crate::models::{CandidateArticle, Source};
use crate::scrapers::PageFetcher;
use anyhow::Result;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{debug, warn};

pub async fn extract(
    source: &Source,
    fetcher: &dyn PageFetcher,
    today: NaiveDate,
) -> Result<Vec<CandidateArticle>> {
    let listing_html = fetcher.fetch(&source.url).await?;
    let article_urls = parse_listing(&listing_html);

    let mut candidates = Vec::new();
    for url in article_urls {
        let detail_html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "detail fetch failed; skipping entry");
                continue;
            }
        };
        match parse_detail(&detail_html, &url, today) {
            Detail::Today(candidate) => candidates.push(candidate),
            Detail::NotToday => {}
            Detail::Malformed(what) => {
                warn!(%url, missing = what, "detail page missing a required field; skipping entry");
            }
        }
    }
    Ok(candidates)
}

fn parse_listing(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let entry_selector = Selector::parse("article").unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let mut urls = Vec::new();
    for entry in document.select(&entry_selector) {
        match entry
            .select(&link_selector)
            .next()
            .and_then(|el| el.value().attr("href"))
        {
            Some(href) => urls.push(href.to_string()),
            None => debug!("listing entry without link; skipping"),
        }
    }
    urls
}

enum Detail {
    Today(CandidateArticle),
    NotToday,
    Malformed(&'static str),
}

fn parse_detail(html: &str, url: &str, today: NaiveDate) -> Detail {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    let date_selector = Selector::parse("span.fecha").unwrap();
    let title_selector = Selector::parse("h1").unwrap();
    let image_selector = Selector::parse("img.attachment-post-thumbnail").unwrap();
    let text_selector = Selector::parse("#dslc-theme-content-inner p").unwrap();

    let Some(external_id) = document.select(&body_selector).next().and_then(|body| {
        body.value()
            .classes()
            .find(|class| class.starts_with("postid-"))
            .map(|class| class["postid-".len()..].to_string())
    }) else {
        return Detail::Malformed("postid body class");
    };

    let Some(post_date) = document
        .select(&date_selector)
        .next()
        .and_then(|el| parse_spanish_date(&el.text().collect::<String>()))
    else {
        return Detail::Malformed("fecha");
    };
    if post_date != today {
        return Detail::NotToday;
    }

    let Some(title) = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
    else {
        return Detail::Malformed("h1 title");
    };
    let Some(image) = document
        .select(&image_selector)
        .next()
        .and_then(|el| el.value().attr("data-src"))
        .map(str::to_string)
    else {
        return Detail::Malformed("thumbnail data-src");
    };
    let Some(body) = document
        .select(&text_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
    else {
        return Detail::Malformed("body paragraph");
    };

    Detail::Today(CandidateArticle {
        external_id,
        url: url.to_string(),
        title,
        post_date,
        image,
        body,
    })
}

/// Parse "12 de agosto, 2025"-style dates without depending on system
/// locale data.
fn parse_spanish_date(text: &str) -> Option<NaiveDate> {
    const MONTHS: [&str; 12] = [
        "enero",
        "febrero",
        "marzo",
        "abril",
        "mayo",
        "junio",
        "julio",
        "agosto",
        "septiembre",
        "octubre",
        "noviembre",
        "diciembre",
    ];

    let text = text.trim().to_lowercase();
    let (day, rest) = text.split_once(" de ")?;
    let (month, year) = rest.split_once(',')?;

    let day: u32 = day.trim().parse().ok()?;
    let month = MONTHS.iter().position(|m| *m == month.trim())? as u32 + 1;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use crate::scrapers::testutil::FakeFetcher;

    fn detail_page(id: u32, date: &str) -> String {
        format!(
            r#"<html><body class="single single-post postid-{id} single-format-standard">
                 <h1>Nota {id}</h1>
                 <span class="fecha">{date}</span>
                 <img class="attachment-post-thumbnail" src="placeholder.gif" data-src="https://dslc.example/{id}.jpg">
                 <div id="dslc-theme-content-inner"><p>Cuerpo {id}</p></div>
               </body></html>"#
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    #[test]
    fn spanish_dates_parse() {
        assert_eq!(
            parse_spanish_date("30 de agosto, 2026"),
            NaiveDate::from_ymd_opt(2026, 8, 30)
        );
        assert_eq!(
            parse_spanish_date("  1 de Enero, 2025 "),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(parse_spanish_date("30 de augusto, 2026"), None);
        assert_eq!(parse_spanish_date("agosto 30, 2026"), None);
    }

    #[tokio::test]
    async fn fetches_details_and_keeps_todays_entries() {
        let listing = r#"
            <article><a href="https://dslc.example/nota-11">Nota 11</a></article>
            <article><a href="https://dslc.example/nota-12">Nota 12</a></article>
        "#;
        let fetcher = FakeFetcher::new(vec![
            ("https://dslc.example/", listing),
            ("https://dslc.example/nota-11", &detail_page(11, "30 de agosto, 2026")),
            ("https://dslc.example/nota-12", &detail_page(12, "29 de agosto, 2026")),
        ]);
        let source = Source {
            id: 2,
            name: "DSLC".to_string(),
            url: "https://dslc.example/".to_string(),
            kind: SourceKind::Dslc,
        };

        let candidates = extract(&source, &fetcher, today()).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "11");
        assert_eq!(candidates[0].title, "Nota 11");
        assert_eq!(candidates[0].image, "https://dslc.example/11.jpg");
        assert_eq!(candidates[0].url, "https://dslc.example/nota-11");
    }

    #[tokio::test]
    async fn failed_detail_fetch_skips_only_that_entry() {
        let listing = r#"
            <article><a href="https://dslc.example/gone">Gone</a></article>
            <article><a href="https://dslc.example/nota-5">Nota 5</a></article>
        "#;
        // "gone" has no canned page, so its fetch errors.
        let fetcher = FakeFetcher::new(vec![
            ("https://dslc.example/", listing),
            ("https://dslc.example/nota-5", &detail_page(5, "30 de agosto, 2026")),
        ]);
        let source = Source {
            id: 2,
            name: "DSLC".to_string(),
            url: "https://dslc.example/".to_string(),
            kind: SourceKind::Dslc,
        };

        let candidates = extract(&source, &fetcher, today()).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "5");
    }

    #[test]
    fn detail_without_postid_class_is_malformed() {
        let html = r#"<html><body class="single"><h1>X</h1>
                      <span class="fecha">30 de agosto, 2026</span></body></html>"#;
        assert!(matches!(
            parse_detail(html, "https://dslc.example/x", today()),
            Detail::Malformed("postid body class")
        ));
    }
}
