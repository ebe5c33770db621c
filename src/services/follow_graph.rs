// FollowService - directional follow edges between users

use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    core::UserId,
    error::{AppError, AppResult},
    infrastructure::traits::UserRepository,
    models::{NewNotification, Target, User, Verb},
    privacy::{self, Action, Resource},
};

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UserRepository>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    async fn resolve(&self, id: UserId) -> AppResult<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
    }

    /// Adding an existing edge is a no-op, but the target is notified on every call.
    #[instrument(skip(self))]
    pub async fn follow(&self, actor: UserId, target: UserId) -> AppResult<User> {
        let followee = self.resolve(target).await?;
        privacy::ensure(Some(actor), Action::Follow, &Resource::from(&followee))?;

        if followee.id == actor {
            return Err(AppError::InvalidOperation(
                "You cannot follow yourself.".to_string(),
            ));
        }

        let notification = NewNotification::new(
            followee.id,
            actor,
            Verb::StartedFollowing,
            Some(Target::user(followee.id)),
        );
        let created = self
            .users
            .add_following(actor, followee.id, Some(notification))
            .await?;

        info!(%actor, followee = %followee.id, created, "Followed user");
        Ok(followee)
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, actor: UserId, target: UserId) -> AppResult<User> {
        let followee = self.resolve(target).await?;
        privacy::ensure(Some(actor), Action::Follow, &Resource::from(&followee))?;

        let removed = self.users.remove_following(actor, followee.id).await?;
        info!(%actor, followee = %followee.id, removed, "Unfollowed user");
        Ok(followee)
    }
}

pub fn followed_message(user: &User) -> String {
    format!("You are now following {}.", user.username)
}

pub fn unfollowed_message(user: &User) -> String {
    format!("You have unfollowed {}.", user.username)
}
