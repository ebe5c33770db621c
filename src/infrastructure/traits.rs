// Repository interfaces - one per entity, the storage engine stays behind these

use crate::core::{CommentId, NotificationId, PostId, UserId};
use crate::error::AppResult;
use crate::models::{
    Comment, CommentUpdate, Like, NewComment, NewNotification, NewPost, NewUser, Notification,
    NotificationQuery, Page, Post, PostQuery, PostUpdate, ProfileUpdate, User, UserCredentials,
};
use async_trait::async_trait;

/// Accounts and the follow graph between them.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;
    async fn get_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>>;
    async fn username_taken(&self, username: &str, except: Option<UserId>) -> AppResult<bool>;
    /// An empty `profile_picture` clears the stored one.
    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> AppResult<Option<User>>;
    /// Cascades to posts, comments, likes, follow edges, tokens and notifications.
    async fn delete_user(&self, id: UserId) -> AppResult<bool>;

    /// Returns false when the edge already existed. `notification` is appended either way,
    /// in the same transaction as the edge.
    async fn add_following(
        &self,
        follower: UserId,
        followee: UserId,
        notification: Option<NewNotification>,
    ) -> AppResult<bool>;
    /// Returns false when there was no edge.
    async fn remove_following(&self, follower: UserId, followee: UserId) -> AppResult<bool>;
    async fn following_ids(&self, id: UserId) -> AppResult<Vec<UserId>>;
    async fn following_usernames(&self, id: UserId) -> AppResult<Vec<String>>;
    async fn follower_usernames(&self, id: UserId) -> AppResult<Vec<String>>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Stores `candidate` unless the user already has a key; returns the stored key either way.
    async fn get_or_create_token(&self, user: UserId, candidate: &str) -> AppResult<String>;
    async fn resolve_token(&self, key: &str) -> AppResult<Option<UserId>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, new_post: NewPost) -> AppResult<Post>;
    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>>;
    async fn list_posts(&self, query: PostQuery) -> AppResult<Vec<Post>>;
    /// Newest first.
    async fn list_posts_by_authors(&self, authors: &[UserId], page: Page) -> AppResult<Vec<Post>>;
    async fn update_post(&self, id: PostId, update: PostUpdate) -> AppResult<Option<Post>>;
    async fn delete_post(&self, id: PostId) -> AppResult<bool>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// The comment and `notification` commit together or not at all.
    async fn create_comment(
        &self,
        new_comment: NewComment,
        notification: Option<NewNotification>,
    ) -> AppResult<Comment>;
    async fn get_comment(&self, id: CommentId) -> AppResult<Option<Comment>>;
    async fn list_comments(&self, post: Option<PostId>, page: Page) -> AppResult<Vec<Comment>>;
    async fn update_comment(&self, id: CommentId, update: CommentUpdate) -> AppResult<Option<Comment>>;
    async fn delete_comment(&self, id: CommentId) -> AppResult<bool>;
}

/// The like ledger.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Atomic find-or-insert. The flag is true when this call created the row;
    /// only then is `notification` appended, in the same transaction.
    async fn get_or_create_like(
        &self,
        user: UserId,
        post: PostId,
        notification: Option<NewNotification>,
    ) -> AppResult<(Like, bool)>;
    async fn delete_like(&self, user: UserId, post: PostId) -> AppResult<bool>;
    async fn count_likes(&self, post: PostId) -> AppResult<i64>;
}

/// The notification sink. Rows are appended and only ever have `is_read` flipped.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, new_notification: NewNotification) -> AppResult<Notification>;
    async fn get_notification(&self, id: NotificationId) -> AppResult<Option<Notification>>;
    /// Newest first.
    async fn list_notifications(
        &self,
        recipient: UserId,
        query: NotificationQuery,
    ) -> AppResult<Vec<Notification>>;
    async fn mark_read(&self, id: NotificationId) -> AppResult<Option<Notification>>;
}
