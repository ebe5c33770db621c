use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::UserId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub date_joined: DateTime<Utc>,
}

/// Stored login material. Never serialized.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
    }
}

/// A user together with both directions of the follow graph, by username.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub followers: Vec<String>,
    pub following: Vec<String>,
}
