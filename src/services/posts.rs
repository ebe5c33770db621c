// PostService - author-owned posts and the like ledger hanging off them

use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    core::{PostId, UserId},
    error::{AppError, AppResult},
    infrastructure::traits::{LikeRepository, PostRepository},
    models::{NewNotification, NewPost, Post, PostQuery, PostUpdate, Target, Verb},
    privacy::{self, Action, Resource},
    services::require_text,
};

pub const MAX_TITLE_CHARS: usize = 200;

pub const LIKED_MESSAGE: &str = "Post liked successfully.";
pub const UNLIKED_MESSAGE: &str = "Post unliked successfully.";

fn validate_title(title: &str) -> AppResult<()> {
    require_text("title", title)?;
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title: Ensure this field has no more than {} characters.",
            MAX_TITLE_CHARS
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    likes: Arc<dyn LikeRepository>,
    max_page_size: u32,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        likes: Arc<dyn LikeRepository>,
        max_page_size: u32,
    ) -> Self {
        Self {
            posts,
            likes,
            max_page_size,
        }
    }

    #[instrument(skip(self, content))]
    pub async fn create_post(&self, actor: UserId, title: String, content: String) -> AppResult<Post> {
        privacy::ensure(Some(actor), Action::Create, &Resource::Post { author: actor })?;
        validate_title(&title)?;
        require_text("content", &content)?;

        let post = self
            .posts
            .create_post(NewPost {
                author_id: actor,
                title,
                content,
            })
            .await?;

        info!(post_id = %post.id, author = %actor, "Created post");
        Ok(post)
    }

    pub async fn get_post(&self, id: PostId) -> AppResult<Post> {
        self.posts
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found.".to_string()))
    }

    pub async fn list_posts(&self, query: PostQuery) -> AppResult<Vec<Post>> {
        let search = query
            .search
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty());

        self.posts
            .list_posts(PostQuery {
                search,
                page: query.page.clamped(self.max_page_size),
            })
            .await
    }

    #[instrument(skip(self, update))]
    pub async fn update_post(&self, actor: UserId, id: PostId, update: PostUpdate) -> AppResult<Post> {
        let post = self.get_post(id).await?;
        privacy::ensure(Some(actor), Action::Update, &Resource::from(&post))?;

        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(content) = &update.content {
            require_text("content", content)?;
        }

        let updated = self
            .posts
            .update_post(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found.".to_string()))?;

        info!(post_id = %id, "Updated post");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, actor: UserId, id: PostId) -> AppResult<()> {
        let post = self.get_post(id).await?;
        privacy::ensure(Some(actor), Action::Delete, &Resource::from(&post))?;

        self.posts.delete_post(id).await?;
        info!(post_id = %id, "Deleted post");
        Ok(())
    }

    /// At most one like per (actor, post). The author is notified unless they liked their own post.
    #[instrument(skip(self))]
    pub async fn like(&self, actor: UserId, id: PostId) -> AppResult<()> {
        let post = self.get_post(id).await?;
        privacy::ensure(Some(actor), Action::Like, &Resource::from(&post))?;

        let notification = (actor != post.author_id).then(|| {
            NewNotification::new(post.author_id, actor, Verb::Liked, Some(Target::post(post.id)))
        });
        let (_, created) = self
            .likes
            .get_or_create_like(actor, post.id, notification)
            .await?;
        if !created {
            return Err(AppError::Conflict(
                "You have already liked this post.".to_string(),
            ));
        }

        info!(post_id = %post.id, %actor, "Liked post");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unlike(&self, actor: UserId, id: PostId) -> AppResult<()> {
        let post = self.get_post(id).await?;
        privacy::ensure(Some(actor), Action::Like, &Resource::from(&post))?;

        if !self.likes.delete_like(actor, post.id).await? {
            return Err(AppError::NotLiked("You have not liked this post.".to_string()));
        }

        info!(post_id = %post.id, %actor, "Unliked post");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::infrastructure::{NotificationRepository, SqliteDatabase, UserRepository};
    use crate::models::{NewUser, NotificationQuery, Page, User};

    async fn user(db: &SqliteDatabase, name: &str) -> User {
        db.create_user(NewUser {
            username: name.to_string(),
            email: String::new(),
            password_hash: "x".to_string(),
            bio: String::new(),
            profile_picture: None,
        })
        .await
        .unwrap()
    }

    async fn setup() -> (Arc<SqliteDatabase>, PostService) {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let service = PostService::new(db.clone(), db.clone(), 100);
        (db, service)
    }

    async fn inbox(db: &SqliteDatabase, recipient: UserId) -> Vec<String> {
        db.list_notifications(recipient, NotificationQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.verb)
            .collect()
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let (db, service) = setup().await;
        let alice = user(&db, "alice").await;

        let err = service
            .create_post(alice.id, "  ".into(), "body".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create_post(alice.id, "x".repeat(201), "body".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create_post(alice.id, "Title".into(), "\n".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let post = service
            .create_post(alice.id, "x".repeat(200), "body".into())
            .await
            .unwrap();
        assert_eq!(post.author, "alice");
        assert_eq!(post.likes_count, 0);
    }

    #[tokio::test]
    async fn test_second_like_is_conflict() {
        let (db, service) = setup().await;
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        let post = service.create_post(bob.id, "Hi".into(), "there".into()).await.unwrap();

        service.like(alice.id, post.id).await.unwrap();
        let err = service.like(alice.id, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_eq!(db.count_likes(post.id).await.unwrap(), 1);
        assert_eq!(service.get_post(post.id).await.unwrap().likes_count, 1);
        assert_eq!(inbox(&db, bob.id).await, vec!["liked".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_likes_create_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite:{}", dir.path().join("likes.db").display()),
            max_connections: 5,
        };
        let db = Arc::new(SqliteDatabase::connect(&config).await.unwrap());
        let service = PostService::new(db.clone(), db.clone(), 100);
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        let post = service.create_post(bob.id, "Hi".into(), "there".into()).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.like(alice.id, post.id).await })
            })
            .collect();

        let mut liked = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => liked += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(liked, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(db.count_likes(post.id).await.unwrap(), 1);
        assert_eq!(inbox(&db, bob.id).await, vec!["liked".to_string()]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_like_unlike_unlike() {
        let (db, service) = setup().await;
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        let post = service.create_post(bob.id, "Hi".into(), "there".into()).await.unwrap();

        service.like(alice.id, post.id).await.unwrap();
        service.unlike(alice.id, post.id).await.unwrap();
        let err = service.unlike(alice.id, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotLiked(_)));
        assert_eq!(db.count_likes(post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_liking_own_post_is_silent() {
        let (db, service) = setup().await;
        let bob = user(&db, "bob").await;
        let post = service.create_post(bob.id, "Hi".into(), "there".into()).await.unwrap();

        service.like(bob.id, post.id).await.unwrap();
        assert!(inbox(&db, bob.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let (db, service) = setup().await;
        let alice = user(&db, "alice").await;
        let err = service.like(alice.id, PostId::new(77)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = service.unlike(alice.id, PostId::new(77)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_only_author_updates_and_deletes() {
        let (db, service) = setup().await;
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        let post = service.create_post(bob.id, "Hi".into(), "there".into()).await.unwrap();

        let update = PostUpdate {
            title: Some("Edited".into()),
            content: None,
        };
        let err = service.update_post(alice.id, post.id, update.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = service.delete_post(alice.id, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = service.update_post(bob.id, post.id, update).await.unwrap();
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.content, "there");

        service.delete_post(bob.id, post.id).await.unwrap();
        assert!(matches!(service.get_post(post.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_search_and_page() {
        let (db, service) = setup().await;
        let bob = user(&db, "bob").await;
        let rust = service.create_post(bob.id, "Rust tips".into(), "ownership".into()).await.unwrap();
        service.create_post(bob.id, "Cooking".into(), "pasta".into()).await.unwrap();
        let third = service.create_post(bob.id, "More".into(), "I like RUST".into()).await.unwrap();

        let found = service
            .list_posts(PostQuery {
                search: Some("rust".into()),
                page: Page::all(),
            })
            .await
            .unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![third.id, rust.id]);

        let first_page = service
            .list_posts(PostQuery {
                search: None,
                page: Page::new(1, 0),
            })
            .await
            .unwrap();
        assert_eq!(first_page.len(), 1);
        assert_eq!(first_page[0].id, third.id);
    }
}
