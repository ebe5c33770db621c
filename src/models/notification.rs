use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{NotificationId, UserId};
use super::Page;

/// What the actor did. Stored as its display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    StartedFollowing,
    Liked,
    CommentedOn,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::StartedFollowing => "started following",
            Verb::Liked => "liked",
            Verb::CommentedOn => "commented on",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    User,
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::User => "user",
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(TargetKind::User),
            "post" => Some(TargetKind::Post),
            "comment" => Some(TargetKind::Comment),
            _ => None,
        }
    }
}

/// Loose reference to the object a notification is about. It may outlive the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub id: i64,
}

impl Target {
    pub fn user(id: UserId) -> Self {
        Self { kind: TargetKind::User, id: id.value() }
    }

    pub fn post(id: crate::core::PostId) -> Self {
        Self { kind: TargetKind::Post, id: id.value() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub actor: UserId,
    pub actor_username: String,
    pub verb: String,
    pub target: Option<Target>,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: UserId,
    pub actor: UserId,
    pub verb: Verb,
    pub target: Option<Target>,
}

impl NewNotification {
    pub fn new(recipient: UserId, actor: UserId, verb: Verb, target: Option<Target>) -> Self {
        Self {
            recipient,
            actor,
            verb,
            target,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub page: Page,
}
