//! # Paperboy
//!
//! A scrape-and-publish pipeline: periodically scrape configured news sites
//! for articles published today, persist them with dedup, and republish
//! each new article to every configured Facebook page and Instagram profile
//! through their Graph-style content APIs.
//!
//! ## Architecture
//!
//! 1. **Ingestion**: per-source extractors pull today's articles from each
//!    listing page and the store dedups them on (external id, source)
//! 2. **Sweep**: today's articles not yet posted anywhere fan out into one
//!    publish job per (article, destination) pair
//! 3. **Publish**: each job runs its platform's protocol (single photo
//!    publish for Facebook, container-then-publish for Instagram) under a
//!    bounded retry policy, and records a post record on success
//!
//! Ingestion and the sweep run on independent recurring schedules in `run`
//! mode; every stage is also exposed as a one-shot subcommand for operators.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval, interval_at};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod ingest;
mod models;
mod publish;
mod scrapers;
mod store;
mod sweep;

use cli::{Cli, Command, PlatformArg};
use config::Config;
use publish::graph::{GraphApi, GraphClient};
use publish::{PublishError, Publisher, RetryPolicy, with_retry};
use scrapers::HttpFetcher;
use store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    let config = config::load(&args.config)?;
    info!(
        config = %args.config,
        sources = config.sources.len(),
        facebook_pages = config.facebook_pages.len(),
        instagram_profiles = config.instagram_profiles.len(),
        "paperboy starting up"
    );

    let store = Arc::new(Store::open(&config.database)?);
    let fetcher = HttpFetcher::new();
    let graph: Arc<dyn GraphApi> = Arc::new(GraphClient::new(&config.graph_api_base));
    let publisher = Arc::new(Publisher::new(
        Arc::clone(&store),
        graph,
        config.sources.clone(),
        config.facebook_pages.clone(),
        config.instagram_profiles.clone(),
        config.caption_footer.clone(),
    ));
    let policy = RetryPolicy::default();

    match args.command {
        Command::Ingest => {
            let today = Local::now().date_naive();
            let created = ingest::run_ingestion(&store, &fetcher, &config.sources, today).await;
            info!(created, "ingestion finished");
        }
        Command::Sweep => {
            let today = Local::now().date_naive();
            let handles = sweep::sweep(
                &publisher,
                &store,
                &config.facebook_pages,
                &config.instagram_profiles,
                &policy,
                today,
            )?;
            info!(scheduled = handles.len(), "sweep scheduled; waiting for jobs");
            for result in futures::future::join_all(handles).await {
                if let Err(e) = result {
                    error!(error = %e, "publish job panicked");
                }
            }
        }
        Command::Run => run_daemon(&config, &store, &fetcher, &publisher, &policy).await,
        Command::Publish {
            article_id,
            facebook_pages,
            instagram_profiles,
        } => {
            for page_id in facebook_pages {
                match with_retry(&policy, || publisher.publish_to_facebook(article_id, page_id))
                    .await
                {
                    Ok(post) => {
                        info!(article_id, page_id, remote_post_id = ?post.remote_post_id, "published to facebook")
                    }
                    Err(PublishError::AlreadyPosted(_)) => {
                        warn!(article_id, page_id, "article already posted to facebook; skipping")
                    }
                    Err(e) => error!(article_id, page_id, error = %e, "facebook publish failed"),
                }
            }
            for profile_id in instagram_profiles {
                match with_retry(&policy, || {
                    publisher.publish_to_instagram(article_id, profile_id)
                })
                .await
                {
                    Ok(post) => {
                        info!(article_id, profile_id, remote_post_id = ?post.remote_post_id, "published to instagram")
                    }
                    Err(PublishError::AlreadyPosted(_)) => {
                        warn!(article_id, profile_id, "article already posted to instagram; skipping")
                    }
                    Err(e) => error!(article_id, profile_id, error = %e, "instagram publish failed"),
                }
            }
        }
        Command::DeletePost { platform, id } => match platform {
            PlatformArg::Facebook => match publisher.delete_facebook_post(id).await {
                Ok(Some(post)) => info!(id, article_id = post.article_id, "facebook post record deleted"),
                Ok(None) => warn!(id, "no such facebook post record"),
                Err(e) => error!(id, error = %e, "facebook post deletion failed"),
            },
            PlatformArg::Instagram => match publisher.delete_instagram_post(id).await {
                Ok(Some(post)) => info!(id, article_id = post.article_id, "instagram post record deleted"),
                Ok(None) => warn!(id, "no such instagram post record"),
                Err(e) => error!(id, error = %e, "instagram post deletion failed"),
            },
        },
    }

    Ok(())
}

/// Long-running mode: ingestion and sweep on independent recurring
/// schedules. The first sweep is offset from startup so freshly ingested
/// articles have time to settle before fan-out.
async fn run_daemon(
    config: &Config,
    store: &Arc<Store>,
    fetcher: &HttpFetcher,
    publisher: &Arc<Publisher>,
    policy: &RetryPolicy,
) {
    let schedule = &config.schedule;
    let mut ingest_tick = interval(Duration::from_secs(schedule.ingest_every_minutes * 60));
    let mut sweep_tick = interval_at(
        Instant::now() + Duration::from_secs(schedule.sweep_offset_minutes * 60),
        Duration::from_secs(schedule.sweep_every_minutes * 60),
    );
    info!(
        ingest_every_minutes = schedule.ingest_every_minutes,
        sweep_every_minutes = schedule.sweep_every_minutes,
        sweep_offset_minutes = schedule.sweep_offset_minutes,
        "schedules started"
    );

    loop {
        tokio::select! {
            _ = ingest_tick.tick() => {
                let today = Local::now().date_naive();
                let created = ingest::run_ingestion(store, fetcher, &config.sources, today).await;
                info!(created, "scheduled ingestion finished");
            }
            _ = sweep_tick.tick() => {
                let today = Local::now().date_naive();
                match sweep::sweep(
                    publisher,
                    store,
                    &config.facebook_pages,
                    &config.instagram_profiles,
                    policy,
                    today,
                ) {
                    // Fire-and-forget: the jobs run to completion on the runtime.
                    Ok(handles) => info!(scheduled = handles.len(), "scheduled sweep dispatched"),
                    Err(e) => error!(error = %e, "scheduled sweep failed to plan"),
                }
            }
        }
    }
}
