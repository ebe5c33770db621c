// FeedService - posts of followed authors, newest first

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    core::UserId,
    error::AppResult,
    infrastructure::traits::{PostRepository, UserRepository},
    models::{Page, Post},
};

#[derive(Clone)]
pub struct FeedService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    max_page_size: u32,
}

impl FeedService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        max_page_size: u32,
    ) -> Self {
        Self {
            users,
            posts,
            max_page_size,
        }
    }

    /// The actor's own posts are excluded.
    #[instrument(skip(self))]
    pub async fn feed(&self, actor: UserId, page: Page) -> AppResult<Vec<Post>> {
        let following = self.users.following_ids(actor).await?;
        if following.is_empty() {
            return Ok(Vec::new());
        }

        let posts = self
            .posts
            .list_posts_by_authors(&following, page.clamped(self.max_page_size))
            .await?;

        debug!(authors = following.len(), posts = posts.len(), "Assembled feed");
        Ok(posts)
    }
}
