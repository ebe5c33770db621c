use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{
        middleware::HasAuthenticator, PasswordHasher, Repositories, SqliteDatabase,
        TokenAuthenticator,
    },
    services::{
        AccountService, CommentService, FeedService, FollowService, NotificationService,
        PostService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub database: Arc<SqliteDatabase>,
    pub authenticator: Arc<TokenAuthenticator>,
    pub accounts: AccountService,
    pub follows: FollowService,
    pub posts: PostService,
    pub comments: CommentService,
    pub feed: FeedService,
    pub notifications: NotificationService,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = Arc::new(SqliteDatabase::connect(&config.database).await?);
        Self::with_database(config, database)
    }

    /// Wire every service against an already opened store.
    pub fn with_database(config: Config, database: Arc<SqliteDatabase>) -> AppResult<Self> {
        let repos = Repositories::sqlite(database.clone());
        let max_page_size = config.pagination.max_page_size;

        let authenticator = Arc::new(TokenAuthenticator::new(
            repos.tokens.clone(),
            config.auth.token_cache_capacity,
        ));
        let hasher = PasswordHasher::new(&config.auth)?;

        Ok(Self {
            accounts: AccountService::new(repos.users.clone(), hasher, authenticator.clone()),
            follows: FollowService::new(repos.users.clone()),
            posts: PostService::new(repos.posts.clone(), repos.likes.clone(), max_page_size),
            comments: CommentService::new(
                repos.comments.clone(),
                repos.posts.clone(),
                max_page_size,
            ),
            feed: FeedService::new(repos.users, repos.posts, max_page_size),
            notifications: NotificationService::new(repos.notifications, max_page_size),
            authenticator,
            database,
            config,
        })
    }
}

impl HasAuthenticator for AppState {
    fn authenticator(&self) -> &Arc<TokenAuthenticator> {
        &self.authenticator
    }
}
