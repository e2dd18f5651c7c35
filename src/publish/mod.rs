//! Destination publishing: error taxonomy, retry policy, and the
//! [`Publisher`] that runs each platform's publish protocol.
//!
//! # Failure classification
//!
//! The key contract is retryable vs terminal:
//! - [`PublishError::AlreadyPosted`] is terminal. It means a stale or
//!   duplicate dispatch hit the precondition check, which is expected under
//!   concurrent fan-out and must never be retried.
//! - [`PublishError::RemoteApi`] and [`PublishError::Transport`] are
//!   retryable; the destination APIs fail transiently all the time (quota,
//!   token refresh windows, plain flakiness).
//!
//! # Idempotency
//!
//! A publish job checks the article's `posted_to_<platform>` flag up front,
//! and on success writes the post record and the flag as one transaction
//! (see [`crate::store`]). The post record is the source of truth; the flag
//! is a cache that post-record deletion reconciles. Two jobs for the same
//! (article, destination) pair dispatched concurrently can both pass the
//! precondition check; the store's per-pair uniqueness stops the second
//! record, but not a duplicate remote post in that window. That race is
//! accepted, not locked around.

pub mod facebook;
pub mod graph;
pub mod instagram;

use crate::models::{Article, FacebookPage, InstagramProfile, Platform, Source};
use crate::store::Store;
use graph::GraphApi;
use rand::{Rng, rng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    /// The article is already flagged as posted on this platform. Terminal:
    /// signals a stale/duplicate dispatch, not a fault.
    #[error("article already posted to {0}")]
    AlreadyPosted(Platform),
    /// The referenced destination is not in the configuration. Terminal.
    #[error("unknown {0} destination {1}")]
    UnknownDestination(Platform, i64),
    /// The destination API answered with an `error` payload.
    #[error("remote API error: {0}")]
    RemoteApi(String),
    /// Network/HTTP-layer failure before a payload could be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Persistence failure around the publish.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PublishError::AlreadyPosted(_) | PublishError::UnknownDestination(..)
        )
    }
}

/// Bounded retry with exponential backoff, shared by both publishers.
///
/// An explicit value object rather than something inherited from the job
/// runner: whoever dispatches a publish decides the policy it runs under.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// First backoff delay; doubles per attempt.
    pub base_delay: Duration,
    /// Cap on the computed delay (jitter excluded).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(120),
        }
    }
}

/// Run `op` under `policy`: retry retryable errors with backoff + jitter,
/// return terminal errors immediately, give up after exhaustion.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, PublishError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PublishError>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    error!(attempt, max = policy.max_retries, error = %e, "publish exhausted retries");
                    return Err(e);
                }

                let exp = (attempt - 1).min(16) as u32;
                let mut delay = policy.base_delay.saturating_mul(1 << exp);
                if delay > policy.max_delay {
                    delay = policy.max_delay;
                }
                let jitter = Duration::from_millis(rng().random_range(0..=250));

                warn!(attempt, max = policy.max_retries, ?delay, error = %e, "publish attempt failed; backing off");
                sleep(delay + jitter).await;
            }
        }
    }
}

/// Executes the per-destination publish protocols and records outcomes.
///
/// Holds the read-only destination/source configuration alongside the store
/// and a [`GraphApi`] transport; cheap to share across spawned publish jobs
/// behind an `Arc`.
pub struct Publisher {
    store: Arc<Store>,
    graph: Arc<dyn GraphApi>,
    sources: HashMap<i64, Source>,
    pages: HashMap<i64, FacebookPage>,
    profiles: HashMap<i64, InstagramProfile>,
    caption_footer: String,
}

impl Publisher {
    pub fn new(
        store: Arc<Store>,
        graph: Arc<dyn GraphApi>,
        sources: Vec<Source>,
        pages: Vec<FacebookPage>,
        profiles: Vec<InstagramProfile>,
        caption_footer: String,
    ) -> Self {
        Publisher {
            store,
            graph,
            sources: sources.into_iter().map(|s| (s.id, s)).collect(),
            pages: pages.into_iter().map(|p| (p.id, p)).collect(),
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
            caption_footer,
        }
    }

    fn page(&self, id: i64) -> Result<&FacebookPage, PublishError> {
        self.pages
            .get(&id)
            .ok_or(PublishError::UnknownDestination(Platform::Facebook, id))
    }

    fn profile(&self, id: i64) -> Result<&InstagramProfile, PublishError> {
        self.profiles
            .get(&id)
            .ok_or(PublishError::UnknownDestination(Platform::Instagram, id))
    }

    /// Caption used on both platforms: title, body, read-more link, source
    /// attribution, and the configured call-to-action footer.
    fn caption(&self, article: &Article) -> String {
        let mut caption = format!(
            "{}\n\n{}\n\nRead the full story: {}",
            article.title, article.body, article.url
        );
        if let Some(source) = self.sources.get(&article.source_id) {
            caption.push_str("\n\nSource: ");
            caption.push_str(&source.url);
        }
        if !self.caption_footer.is_empty() {
            caption.push_str("\n\n");
            caption.push_str(&self.caption_footer);
        }
        caption
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{FakeGraph, publisher, seeded_article};
    use super::*;
    use std::cell::Cell;

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!PublishError::AlreadyPosted(Platform::Facebook).is_retryable());
        assert!(!PublishError::UnknownDestination(Platform::Instagram, 3).is_retryable());
        assert!(PublishError::RemoteApi("quota".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn with_retry_returns_terminal_error_after_one_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let calls = Cell::new(0usize);

        let result: Result<(), _> = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Err(PublishError::AlreadyPosted(Platform::Facebook)) }
        })
        .await;

        assert!(matches!(result, Err(PublishError::AlreadyPosted(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn with_retry_recovers_from_transient_errors() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let calls = Cell::new(0usize);

        let result = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(PublishError::RemoteApi("try again".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn with_retry_gives_up_after_max_retries() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let calls = Cell::new(0usize);

        let result: Result<(), _> = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Err(PublishError::RemoteApi("down".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(PublishError::RemoteApi(_))));
        assert_eq!(calls.get(), 2); // first attempt + one retry
    }

    #[test]
    fn caption_contains_title_body_link_attribution_and_footer() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let article = seeded_article(&store);
        let publisher = publisher(store, Arc::new(FakeGraph::new()));

        let caption = publisher.caption(&article);
        assert!(caption.starts_with("Headline 42\n\nBody 42"));
        assert!(caption.contains("Read the full story: https://news.example/nota-42"));
        assert!(caption.contains("Source: https://news.example/"));
        assert!(caption.ends_with("Follow us on FM 106.9"));
    }
}
