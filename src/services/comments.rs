// CommentService - comments on posts, with a notification to the post's author

use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    core::{CommentId, PostId, UserId},
    error::{AppError, AppResult},
    infrastructure::traits::{CommentRepository, PostRepository},
    models::{Comment, CommentUpdate, NewComment, NewNotification, Page, Target, Verb},
    privacy::{self, Action, Resource},
    services::require_text,
};

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    max_page_size: u32,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        max_page_size: u32,
    ) -> Self {
        Self {
            comments,
            posts,
            max_page_size,
        }
    }

    #[instrument(skip(self, content))]
    pub async fn create_comment(
        &self,
        actor: UserId,
        post_id: PostId,
        content: String,
    ) -> AppResult<Comment> {
        privacy::ensure(Some(actor), Action::Create, &Resource::Comment { author: actor })?;
        let post = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found.".to_string()))?;
        require_text("content", &content)?;

        let notification = (actor != post.author_id).then(|| {
            NewNotification::new(
                post.author_id,
                actor,
                Verb::CommentedOn,
                Some(Target::post(post.id)),
            )
        });
        let comment = self
            .comments
            .create_comment(
                NewComment {
                    post: post.id,
                    author_id: actor,
                    content,
                },
                notification,
            )
            .await?;

        info!(comment_id = %comment.id, post_id = %post.id, %actor, "Created comment");
        Ok(comment)
    }

    pub async fn get_comment(&self, id: CommentId) -> AppResult<Comment> {
        self.comments
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found.".to_string()))
    }

    /// Newest first, optionally restricted to one post.
    pub async fn list_comments(&self, post: Option<PostId>, page: Page) -> AppResult<Vec<Comment>> {
        self.comments
            .list_comments(post, page.clamped(self.max_page_size))
            .await
    }

    #[instrument(skip(self, update))]
    pub async fn update_comment(
        &self,
        actor: UserId,
        id: CommentId,
        update: CommentUpdate,
    ) -> AppResult<Comment> {
        let comment = self.get_comment(id).await?;
        privacy::ensure(Some(actor), Action::Update, &Resource::from(&comment))?;

        if let Some(content) = &update.content {
            require_text("content", content)?;
        }

        let updated = self
            .comments
            .update_comment(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found.".to_string()))?;

        info!(comment_id = %id, "Updated comment");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_comment(&self, actor: UserId, id: CommentId) -> AppResult<()> {
        let comment = self.get_comment(id).await?;
        privacy::ensure(Some(actor), Action::Delete, &Resource::from(&comment))?;

        self.comments.delete_comment(id).await?;
        info!(comment_id = %id, "Deleted comment");
        Ok(())
    }
}
