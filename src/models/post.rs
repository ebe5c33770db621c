use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{PostId, UserId};
use super::Page;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub author: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Case-insensitive match against title or content
    pub search: Option<String>,
    pub page: Page,
}
