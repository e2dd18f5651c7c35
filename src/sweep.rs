//! Auto-publish sweeper: fan out publish jobs for eligible articles.
//!
//! Eligible means dated today and not yet posted to either platform. Each
//! (article, destination) pair becomes one job; a pair appears at most once
//! per sweep, so a single sweep never double-schedules. Jobs are spawned
//! fire-and-forget onto the runtime — the sweeper does not wait for publish
//! outcomes, and one article may be publishing to every destination
//! concurrently. Overlapping sweeps can still race on a pair; the
//! publisher's precondition check and the store's per-pair uniqueness keep
//! that from producing a second post record.

use crate::models::{FacebookPage, InstagramProfile};
use crate::publish::{PublishError, Publisher, RetryPolicy, with_retry};
use crate::store::Store;
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// One scheduled publish of one article to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishJob {
    Facebook { article_id: i64, page_id: i64 },
    Instagram { article_id: i64, profile_id: i64 },
}

/// Compute the sweep fan-out without dispatching anything.
pub fn plan_sweep(
    store: &Store,
    pages: &[FacebookPage],
    profiles: &[InstagramProfile],
    today: NaiveDate,
) -> Result<Vec<PublishJob>> {
    let articles = store.unposted_for_date(today)?;

    let mut jobs = Vec::with_capacity(articles.len() * (pages.len() + profiles.len()));
    for page in pages {
        for article in &articles {
            jobs.push(PublishJob::Facebook {
                article_id: article.id,
                page_id: page.id,
            });
        }
    }
    for profile in profiles {
        for article in &articles {
            jobs.push(PublishJob::Instagram {
                article_id: article.id,
                profile_id: profile.id,
            });
        }
    }
    Ok(jobs)
}

/// Plan today's fan-out and spawn one retried publish task per job.
///
/// Scheduling is fire-and-forget: the sweeper never awaits publish
/// outcomes. The handles are returned so a one-shot caller can keep the
/// process alive until the jobs settle; the daemon just drops them.
#[instrument(level = "info", skip_all, fields(%today))]
pub fn sweep(
    publisher: &Arc<Publisher>,
    store: &Store,
    pages: &[FacebookPage],
    profiles: &[InstagramProfile],
    policy: &RetryPolicy,
    today: NaiveDate,
) -> Result<Vec<tokio::task::JoinHandle<()>>> {
    let jobs = plan_sweep(store, pages, profiles, today)?;
    info!(jobs = jobs.len(), "sweep scheduling publish jobs");

    Ok(jobs
        .into_iter()
        .map(|job| spawn_job(Arc::clone(publisher), policy.clone(), job))
        .collect())
}

fn spawn_job(
    publisher: Arc<Publisher>,
    policy: RetryPolicy,
    job: PublishJob,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = match &job {
            PublishJob::Facebook { article_id, page_id } => {
                with_retry(&policy, || publisher.publish_to_facebook(*article_id, *page_id))
                    .await
                    .map(|post| post.remote_post_id)
            }
            PublishJob::Instagram { article_id, profile_id } => {
                with_retry(&policy, || publisher.publish_to_instagram(*article_id, *profile_id))
                    .await
                    .map(|post| post.remote_post_id)
            }
        };

        match outcome {
            Ok(remote_post_id) => debug!(?job, ?remote_post_id, "publish job finished"),
            // Expected under concurrent dispatch; not alert-worthy.
            Err(PublishError::AlreadyPosted(platform)) => {
                debug!(?job, %platform, "publish job found article already posted")
            }
            Err(e) => error!(?job, error = %e, "publish job failed after retries"),
        }
    })
}
