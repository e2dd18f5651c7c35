//! Instagram publish protocol: two-phase container-then-publish.
//!
//! Phase 1 creates a media container from the image URL and caption; phase 2
//! publishes the container by creation id. Nothing is persisted between the
//! phases: a phase-2 failure leaves the remote container orphaned (the API
//! offers no way to track or reap it) and a retry simply creates a fresh
//! one. At-most-once per article, at-least-once per container.

use super::{Publisher, PublishError};
use crate::models::{InstagramPost, Platform};
use serde_json::Value;
use tracing::{debug, info};

impl Publisher {
    /// Publish one article to one configured Instagram profile.
    pub async fn publish_to_instagram(
        &self,
        article_id: i64,
        profile_id: i64,
    ) -> Result<InstagramPost, PublishError> {
        let profile = self.profile(profile_id)?;
        let article = self.store.article(article_id)?;
        if article.posted_to_instagram {
            return Err(PublishError::AlreadyPosted(Platform::Instagram));
        }

        let caption = self.caption(&article);

        // Phase 1: media container.
        let container = self
            .graph
            .post(
                &format!("{}/media", profile.user_id),
                &[
                    ("image_url", article.image.as_str()),
                    ("caption", caption.as_str()),
                    ("access_token", profile.user_token.as_str()),
                ],
            )
            .await?;
        let creation_id = container
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PublishError::RemoteApi("container response missing id".to_string()))?;
        debug!(article_id, creation_id, "instagram container created");

        // Phase 2: publish the container.
        let response = self
            .graph
            .post(
                &format!("{}/media_publish", profile.user_id),
                &[
                    ("creation_id", creation_id),
                    ("access_token", profile.user_token.as_str()),
                ],
            )
            .await?;

        let remote_post_id = response.get("id").and_then(Value::as_str);
        let post = self
            .store
            .record_instagram_post(article.id, profile.id, remote_post_id)?;
        info!(
            article_id,
            profile = %profile.name,
            remote_post_id = ?post.remote_post_id,
            "instagram post created"
        );
        Ok(post)
    }

    /// Administrative deletion of an Instagram post record.
    ///
    /// The content publishing API has no post deletion, so this is purely
    /// local: remove the record and reconcile the article flag.
    pub async fn delete_instagram_post(
        &self,
        post_row_id: i64,
    ) -> Result<Option<InstagramPost>, PublishError> {
        Ok(self.store.delete_instagram_post(post_row_id)?)
    }
}
