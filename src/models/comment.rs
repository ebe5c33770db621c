use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CommentId, PostId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub author_id: UserId,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post: PostId,
    pub author_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentUpdate {
    pub content: Option<String>,
}
