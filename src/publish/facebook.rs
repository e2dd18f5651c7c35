//! Facebook publish protocol: a single photo-publish request.
//!
//! State machine per (article, page) attempt: Unposted → Posted, no
//! intermediate persisted state. The precondition check makes a duplicate
//! dispatch terminate with [`PublishError::AlreadyPosted`] before any
//! outbound call.

use super::{Publisher, PublishError};
use crate::models::{FacebookPost, Platform};
use serde_json::Value;
use tracing::{info, warn};

impl Publisher {
    /// Publish one article to one configured Facebook page.
    pub async fn publish_to_facebook(
        &self,
        article_id: i64,
        page_id: i64,
    ) -> Result<FacebookPost, PublishError> {
        let page = self.page(page_id)?;
        let article = self.store.article(article_id)?;
        if article.posted_to_facebook {
            return Err(PublishError::AlreadyPosted(Platform::Facebook));
        }

        let caption = self.caption(&article);
        let response = self
            .graph
            .post(
                &format!("{}/photos", page.page_id),
                &[
                    ("caption", caption.as_str()),
                    ("access_token", page.page_token.as_str()),
                    ("url", article.image.as_str()),
                ],
            )
            .await?;

        let remote_post_id = response.get("post_id").and_then(Value::as_str);
        let post = self
            .store
            .record_facebook_post(article.id, page.id, remote_post_id)?;
        info!(
            article_id,
            page = %page.name,
            remote_post_id = ?post.remote_post_id,
            "facebook post created"
        );
        Ok(post)
    }

    /// Administrative deletion of a Facebook post record.
    ///
    /// Tries the remote `DELETE /{post_id}` first, but the provider does not
    /// guarantee support, so a remote failure only logs; the local record is
    /// removed and the article flag reconciled regardless. Returns the
    /// deleted record, or `None` for an unknown id.
    pub async fn delete_facebook_post(
        &self,
        post_row_id: i64,
    ) -> Result<Option<FacebookPost>, PublishError> {
        let Some(post) = self.store.facebook_post(post_row_id)? else {
            return Ok(None);
        };

        if let (Some(remote_id), Ok(page)) = (post.remote_post_id.as_deref(), self.page(post.page_id))
        {
            match self
                .graph
                .delete(remote_id, &[("access_token", page.page_token.as_str())])
                .await
            {
                Ok(_) => info!(remote_id, "remote facebook post deleted"),
                Err(e) => {
                    warn!(remote_id, error = %e, "remote facebook delete failed; removing local record anyway")
                }
            }
        }

        Ok(self.store.delete_facebook_post(post_row_id)?)
    }
}
