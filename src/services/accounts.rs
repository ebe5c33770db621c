// AccountService - registration, login and profile management

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    core::UserId,
    error::{AppError, AppResult},
    infrastructure::{
        security::{PasswordHasher, TokenAuthenticator},
        traits::UserRepository,
    },
    models::{NewUser, ProfileUpdate, User, UserProfile},
    privacy::{self, Action, Resource},
};

pub const MAX_USERNAME_CHARS: usize = 150;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Input to `register`. Optional fields default to empty.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::Validation("username: This field is required.".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::Validation(format!(
            "username: Ensure this field has no more than {} characters.",
            MAX_USERNAME_CHARS
        )));
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(AppError::Validation(
            "username: Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        ));
    }
    Ok(())
}

/// Empty means no email.
fn validate_email(email: &str) -> AppResult<()> {
    if email.is_empty() {
        return Ok(());
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::Validation("email: Enter a valid email address.".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    authenticator: Arc<TokenAuthenticator>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        authenticator: Arc<TokenAuthenticator>,
    ) -> Self {
        Self {
            users,
            hasher,
            authenticator,
        }
    }

    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> AppResult<AuthPayload> {
        validate_username(&registration.username)?;
        if registration.password.is_empty() {
            return Err(AppError::Validation("password: This field is required.".to_string()));
        }
        let email = registration.email.unwrap_or_default();
        validate_email(&email)?;

        if self.users.username_taken(&registration.username, None).await? {
            return Err(AppError::Validation(
                "A user with that username already exists.".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(&registration.password).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: registration.username,
                email,
                password_hash,
                bio: registration.bio.unwrap_or_default(),
                profile_picture: registration.profile_picture.filter(|p| !p.is_empty()),
            })
            .await?;

        let token = self.authenticator.issue_token(user.id).await?;
        info!(user_id = %user.id, "Registered user");
        Ok(AuthPayload { user, token })
    }

    /// Every successful login returns the same token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthPayload> {
        let invalid = || AppError::Validation("Invalid credentials".to_string());

        let Some(credentials) = self.users.get_credentials(username).await? else {
            warn!("Login for unknown username");
            // Same hashing cost as a wrong password
            self.hasher.verify_dummy(password).await?;
            return Err(invalid());
        };
        if !self.hasher.verify(password, &credentials.password_hash).await? {
            warn!(user_id = %credentials.user.id, "Login with wrong password");
            return Err(invalid());
        }

        let token = self.authenticator.issue_token(credentials.user.id).await?;
        info!(user_id = %credentials.user.id, "Logged in");
        Ok(AuthPayload {
            user: credentials.user,
            token,
        })
    }

    async fn profile_of(&self, user: User) -> AppResult<UserProfile> {
        let followers = self.users.follower_usernames(user.id).await?;
        let following = self.users.following_usernames(user.id).await?;
        Ok(UserProfile {
            user,
            followers,
            following,
        })
    }

    /// Public read of any user.
    pub async fn get_user(&self, id: UserId) -> AppResult<UserProfile> {
        let user = self
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
        self.profile_of(user).await
    }

    pub async fn get_profile(&self, actor: UserId) -> AppResult<UserProfile> {
        self.get_user(actor).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, actor: UserId, update: ProfileUpdate) -> AppResult<UserProfile> {
        privacy::ensure(Some(actor), Action::Update, &Resource::User(actor))?;

        if let Some(username) = &update.username {
            validate_username(username)?;
            if self.users.username_taken(username, Some(actor)).await? {
                return Err(AppError::Validation(
                    "A user with that username already exists.".to_string(),
                ));
            }
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }

        let user = match update.is_empty() {
            true => self.users.get_user(actor).await?,
            false => self.users.update_profile(actor, update).await?,
        };
        let user = user.ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        info!(user_id = %actor, "Updated profile");
        self.profile_of(user).await
    }

    /// Removes the account and everything it owns, then drops its cached tokens.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, actor: UserId) -> AppResult<()> {
        privacy::ensure(Some(actor), Action::Delete, &Resource::User(actor))?;

        if !self.users.delete_user(actor).await? {
            return Err(AppError::NotFound("User not found.".to_string()));
        }
        self.authenticator.forget_user(actor).await;

        info!(user_id = %actor, "Deleted account");
        Ok(())
    }
}
