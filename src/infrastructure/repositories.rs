use std::sync::Arc;

use crate::infrastructure::sqlite_database::SqliteDatabase;
use crate::infrastructure::traits::{
    CommentRepository, LikeRepository, NotificationRepository, PostRepository, TokenRepository,
    UserRepository,
};

/// One handle per entity repository. Services take only the ones they need.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn sqlite(db: Arc<SqliteDatabase>) -> Self {
        Self {
            users: db.clone(),
            tokens: db.clone(),
            posts: db.clone(),
            comments: db.clone(),
            likes: db.clone(),
            notifications: db,
        }
    }
}
