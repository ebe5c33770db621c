// Domain records as they leave the store. Request payloads live next to their handlers.

pub mod comment;
pub mod like;
pub mod notification;
pub mod post;
pub mod user;

pub use comment::{Comment, CommentUpdate, NewComment};
pub use like::Like;
pub use notification::{NewNotification, Notification, NotificationQuery, Target, TargetKind, Verb};
pub use post::{NewPost, Post, PostQuery, PostUpdate};
pub use user::{NewUser, ProfileUpdate, User, UserCredentials, UserProfile};

use serde::Deserialize;

/// Optional window over a list. `limit: None` means the whole result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Clamp an explicit limit into `1..=max`.
    pub fn clamped(self, max: u32) -> Self {
        Self {
            limit: self.limit.map(|limit| limit.clamp(1, max.max(1))),
            offset: self.offset,
        }
    }

    /// SQLite `LIMIT` value; -1 means unbounded.
    pub fn sql_limit(&self) -> i64 {
        self.limit.map(i64::from).unwrap_or(-1)
    }

    pub fn sql_offset(&self) -> i64 {
        i64::from(self.offset)
    }
}
