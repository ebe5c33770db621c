// Privacy - the one access-control predicate every mutating operation goes through

use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::models::{Comment, Notification, Post, User};

/// Operations that can be controlled by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Like,
    Follow,
    MarkRead,
}

/// What is being acted on, reduced to the fields the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A user's profile
    User(UserId),
    Post { author: UserId },
    Comment { author: UserId },
    Notification { recipient: UserId },
}

impl From<&User> for Resource {
    fn from(user: &User) -> Self {
        Resource::User(user.id)
    }
}

impl From<&Post> for Resource {
    fn from(post: &Post) -> Self {
        Resource::Post { author: post.author_id }
    }
}

impl From<&Comment> for Resource {
    fn from(comment: &Comment) -> Self {
        Resource::Comment { author: comment.author_id }
    }
}

impl From<&Notification> for Resource {
    fn from(notification: &Notification) -> Self {
        Resource::Notification { recipient: notification.recipient }
    }
}

pub fn can(actor: Option<UserId>, action: Action, resource: &Resource) -> bool {
    use Action::*;

    match (action, resource) {
        // Profiles and content are public to read
        (Read, Resource::User(_) | Resource::Post { .. } | Resource::Comment { .. }) => true,
        _ => {
            let Some(actor) = actor else {
                return false;
            };
            match (action, resource) {
                // New content is always authored by the caller
                (Create, Resource::Post { author } | Resource::Comment { author }) => {
                    *author == actor
                }
                (Follow, Resource::User(_)) => true,
                (Like, Resource::Post { .. }) => true,
                (Update | Delete, Resource::User(id)) => *id == actor,
                (Update | Delete, Resource::Post { author } | Resource::Comment { author }) => {
                    *author == actor
                }
                (Read | MarkRead, Resource::Notification { recipient }) => *recipient == actor,
                _ => false,
            }
        }
    }
}

/// `can` as a guard: anonymous callers get 401, authenticated ones 403.
pub fn ensure(actor: Option<UserId>, action: Action, resource: &Resource) -> AppResult<()> {
    if can(actor, action, resource) {
        return Ok(());
    }
    match actor {
        None => Err(AppError::Unauthorized(
            "Authentication credentials were not provided.".to_string(),
        )),
        Some(_) => Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        )),
    }
}
