use async_trait::async_trait;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::core::{current_time_millis, timestamp_from_millis, CommentId, NotificationId, PostId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::{
    CommentRepository, LikeRepository, NotificationRepository, PostRepository, TokenRepository,
    UserRepository,
};
use crate::models::{
    Comment, CommentUpdate, Like, NewComment, NewNotification, NewPost, NewUser, Notification,
    NotificationQuery, Page, Post, PostQuery, PostUpdate, ProfileUpdate, Target, TargetKind, User,
    UserCredentials,
};

const USER_COLUMNS: &str =
    "id, username, email, bio, profile_picture, date_joined, password_hash";

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.username AS author, p.title, p.content, \
     p.created_at, p.updated_at, \
     (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count \
     FROM posts p JOIN users u ON u.id = p.author_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.username AS author, \
     c.content, c.created_at, c.updated_at \
     FROM comments c JOIN users u ON u.id = c.author_id";

const NOTIFICATION_SELECT: &str = "SELECT n.id, n.recipient_id, n.actor_id, \
     a.username AS actor_username, n.verb, n.target_type, n.target_id, n.is_read, n.timestamp \
     FROM notifications n JOIN users a ON a.id = n.actor_id";

fn db_error(action: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(format!("Failed to {}: {}", action, e))
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Directory that must exist before SQLite can create the database file.
fn database_parent_dir(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

/// Escape `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: UserId::new(row.get("id")),
        username: row.get("username"),
        email: row.get("email"),
        bio: row.get("bio"),
        profile_picture: row.get("profile_picture"),
        date_joined: timestamp_from_millis(row.get("date_joined")),
    }
}

fn post_from_row(row: &SqliteRow) -> Post {
    Post {
        id: PostId::new(row.get("id")),
        author_id: UserId::new(row.get("author_id")),
        author: row.get("author"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: timestamp_from_millis(row.get("created_at")),
        updated_at: timestamp_from_millis(row.get("updated_at")),
        likes_count: row.get("likes_count"),
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: CommentId::new(row.get("id")),
        post: PostId::new(row.get("post_id")),
        author_id: UserId::new(row.get("author_id")),
        author: row.get("author"),
        content: row.get("content"),
        created_at: timestamp_from_millis(row.get("created_at")),
        updated_at: timestamp_from_millis(row.get("updated_at")),
    }
}

fn notification_from_row(row: &SqliteRow) -> Notification {
    let target_type: Option<String> = row.get("target_type");
    let target_id: Option<i64> = row.get("target_id");
    let target = match (target_type.as_deref().and_then(TargetKind::parse), target_id) {
        (Some(kind), Some(id)) => Some(Target { kind, id }),
        _ => None,
    };

    Notification {
        id: NotificationId::new(row.get("id")),
        recipient: UserId::new(row.get("recipient_id")),
        actor: UserId::new(row.get("actor_id")),
        actor_username: row.get("actor_username"),
        verb: row.get("verb"),
        target,
        is_read: row.get("is_read"),
        timestamp: timestamp_from_millis(row.get("timestamp")),
    }
}

/// Append one notification on an open connection or transaction.
async fn insert_notification(
    conn: &mut SqliteConnection,
    notification: &NewNotification,
) -> AppResult<NotificationId> {
    let (target_type, target_id) = match notification.target {
        Some(target) => (Some(target.kind.as_str()), Some(target.id)),
        None => (None, None),
    };

    let result = sqlx::query(
        "INSERT INTO notifications (recipient_id, actor_id, verb, target_type, target_id, is_read, timestamp)
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(notification.recipient.value())
    .bind(notification.actor.value())
    .bind(notification.verb.as_str())
    .bind(target_type)
    .bind(target_id)
    .bind(current_time_millis())
    .execute(conn)
    .await
    .map_err(db_error("create notification"))?;

    Ok(NotificationId::new(result.last_insert_rowid()))
}

/// SQLite implementation of every repository interface
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid DATABASE_URL {}: {}", config.url, e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to :memory: is its own database, so pin exactly one.
        let pool_options = if is_memory_url(&config.url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            if let Some(dir) = database_parent_dir(&config.url) {
                std::fs::create_dir_all(dir).map_err(|e| {
                    AppError::ConfigurationError(format!(
                        "Failed to create database directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db_error("connect to SQLite"))?;

        info!("Connected to SQLite at {}", config.url);
        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create tables and indexes; safe to run on every start.
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                profile_picture TEXT,
                date_joined INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS auth_tokens (
                key TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS follows (
                follower_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                followee_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created INTEGER NOT NULL,
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS likes (
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, post_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                actor_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                verb TEXT NOT NULL,
                target_type TEXT,
                target_id INTEGER,
                is_read INTEGER NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id)",
            "CREATE INDEX IF NOT EXISTS idx_posts_author_created ON posts(author_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_likes_post ON likes(post_id)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, timestamp DESC)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("initialize schema"))?;
        }

        debug!("Schema initialized");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteDatabase {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let now = current_time_millis();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, bio, profile_picture, date_joined)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.bio)
        .bind(&new_user.profile_picture)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Validation("A user with that username already exists.".to_string())
            }
            _ => db_error("create user")(e),
        })?;

        Ok(User {
            id: UserId::new(result.last_insert_rowid()),
            username: new_user.username,
            email: new_user.email,
            bio: new_user.bio,
            profile_picture: new_user.profile_picture,
            date_joined: timestamp_from_millis(now),
        })
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get user"))?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get credentials"))?;

        Ok(row.map(|row| UserCredentials {
            user: user_from_row(&row),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn username_taken(&self, username: &str, except: Option<UserId>) -> AppResult<bool> {
        let except = except.map(|id| id.value());
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ? AND (? IS NULL OR id <> ?)")
            .bind(username)
            .bind(except)
            .bind(except)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("check username"))?;

        Ok(row.is_some())
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> AppResult<Option<User>> {
        let result = sqlx::query(
            "UPDATE users SET
                username = COALESCE(?, username),
                email = COALESCE(?, email),
                bio = COALESCE(?, bio),
                profile_picture = CASE WHEN ? IS NULL THEN profile_picture ELSE NULLIF(?, '') END
             WHERE id = ?",
        )
        .bind(update.username)
        .bind(update.email)
        .bind(update.bio)
        .bind(update.profile_picture.clone())
        .bind(update.profile_picture)
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Validation("A user with that username already exists.".to_string())
            }
            _ => db_error("update profile")(e),
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    async fn delete_user(&self, id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete user"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_following(
        &self,
        follower: UserId,
        followee: UserId,
        notification: Option<NewNotification>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, followee_id, created) VALUES (?, ?, ?)
             ON CONFLICT(follower_id, followee_id) DO NOTHING",
        )
        .bind(follower.value())
        .bind(followee.value())
        .bind(current_time_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_error("add follow edge"))?;

        if let Some(notification) = &notification {
            insert_notification(&mut tx, notification).await?;
        }

        tx.commit().await.map_err(db_error("commit follow"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_following(&self, follower: UserId, followee: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower.value())
            .bind(followee.value())
            .execute(&self.pool)
            .await
            .map_err(db_error("remove follow edge"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn following_ids(&self, id: UserId) -> AppResult<Vec<UserId>> {
        let ids = sqlx::query("SELECT followee_id FROM follows WHERE follower_id = ? ORDER BY created DESC")
            .bind(id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list following"))?
            .into_iter()
            .map(|row| UserId::new(row.get::<i64, _>(0)))
            .collect();

        Ok(ids)
    }

    async fn following_usernames(&self, id: UserId) -> AppResult<Vec<String>> {
        let names = sqlx::query(
            "SELECT u.username FROM follows f JOIN users u ON u.id = f.followee_id
             WHERE f.follower_id = ? ORDER BY u.username",
        )
        .bind(id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list following"))?
        .into_iter()
        .map(|row| row.get::<String, _>(0))
        .collect();

        Ok(names)
    }

    async fn follower_usernames(&self, id: UserId) -> AppResult<Vec<String>> {
        let names = sqlx::query(
            "SELECT u.username FROM follows f JOIN users u ON u.id = f.follower_id
             WHERE f.followee_id = ? ORDER BY u.username",
        )
        .bind(id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list followers"))?
        .into_iter()
        .map(|row| row.get::<String, _>(0))
        .collect();

        Ok(names)
    }
}

#[async_trait]
impl TokenRepository for SqliteDatabase {
    async fn get_or_create_token(&self, user: UserId, candidate: &str) -> AppResult<String> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query(
            "INSERT INTO auth_tokens (key, user_id, created) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(candidate)
        .bind(user.value())
        .bind(current_time_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_error("store token"))?;

        let row = sqlx::query("SELECT key FROM auth_tokens WHERE user_id = ?")
            .bind(user.value())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("load token"))?;

        tx.commit().await.map_err(db_error("commit token"))?;
        Ok(row.get("key"))
    }

    async fn resolve_token(&self, key: &str) -> AppResult<Option<UserId>> {
        let row = sqlx::query("SELECT user_id FROM auth_tokens WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("resolve token"))?;

        Ok(row.map(|row| UserId::new(row.get("user_id"))))
    }
}

#[async_trait]
impl PostRepository for SqliteDatabase {
    async fn create_post(&self, new_post: NewPost) -> AppResult<Post> {
        let now = current_time_millis();
        let result = sqlx::query(
            "INSERT INTO posts (author_id, title, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_post.author_id.value())
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("create post"))?;

        let id = PostId::new(result.last_insert_rowid());
        self.get_post(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Post {} vanished after insert", id)))
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_SELECT))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get post"))?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn list_posts(&self, query: PostQuery) -> AppResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);

        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            qb.push(" WHERE (p.title LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR p.content LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(query.page.sql_limit());
        qb.push(" OFFSET ");
        qb.push_bind(query.page.sql_offset());

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list posts"))?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn list_posts_by_authors(&self, authors: &[UserId], page: Page) -> AppResult<Vec<Post>> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
        qb.push(" WHERE p.author_id IN (");
        let mut separated = qb.separated(",");
        for author in authors {
            separated.push_bind(author.value());
        }
        qb.push(") ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(page.sql_limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.sql_offset());

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list posts by authors"))?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn update_post(&self, id: PostId, update: PostUpdate) -> AppResult<Option<Post>> {
        let result = sqlx::query(
            "UPDATE posts SET title = COALESCE(?, title), content = COALESCE(?, content), updated_at = ?
             WHERE id = ?",
        )
        .bind(update.title)
        .bind(update.content)
        .bind(current_time_millis())
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(db_error("update post"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_post(id).await
    }

    async fn delete_post(&self, id: PostId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete post"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepository for SqliteDatabase {
    async fn create_comment(
        &self,
        new_comment: NewComment,
        notification: Option<NewNotification>,
    ) -> AppResult<Comment> {
        let now = current_time_millis();
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let result = sqlx::query(
            "INSERT INTO comments (post_id, author_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_comment.post.value())
        .bind(new_comment.author_id.value())
        .bind(&new_comment.content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("create comment"))?;
        let id = CommentId::new(result.last_insert_rowid());

        if let Some(notification) = &notification {
            insert_notification(&mut tx, notification).await?;
        }

        tx.commit().await.map_err(db_error("commit comment"))?;
        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Comment {} vanished after insert", id)))
    }

    async fn get_comment(&self, id: CommentId) -> AppResult<Option<Comment>> {
        let row = sqlx::query(&format!("{} WHERE c.id = ?", COMMENT_SELECT))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get comment"))?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn list_comments(&self, post: Option<PostId>, page: Page) -> AppResult<Vec<Comment>> {
        let mut qb = QueryBuilder::<Sqlite>::new(COMMENT_SELECT);
        if let Some(post) = post {
            qb.push(" WHERE c.post_id = ");
            qb.push_bind(post.value());
        }
        qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ");
        qb.push_bind(page.sql_limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.sql_offset());

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list comments"))?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn update_comment(&self, id: CommentId, update: CommentUpdate) -> AppResult<Option<Comment>> {
        let result = sqlx::query(
            "UPDATE comments SET content = COALESCE(?, content), updated_at = ? WHERE id = ?",
        )
        .bind(update.content)
        .bind(current_time_millis())
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(db_error("update comment"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_comment(id).await
    }

    async fn delete_comment(&self, id: CommentId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete comment"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LikeRepository for SqliteDatabase {
    async fn get_or_create_like(
        &self,
        user: UserId,
        post: PostId,
        notification: Option<NewNotification>,
    ) -> AppResult<(Like, bool)> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        // The primary key on (user_id, post_id) makes this a single atomic find-or-insert.
        let result = sqlx::query(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id, post_id) DO NOTHING",
        )
        .bind(user.value())
        .bind(post.value())
        .bind(current_time_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert like"))?;
        let created = result.rows_affected() > 0;

        let row = sqlx::query("SELECT created_at FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(user.value())
            .bind(post.value())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("load like"))?;

        if let (true, Some(notification)) = (created, &notification) {
            insert_notification(&mut tx, notification).await?;
        }

        tx.commit().await.map_err(db_error("commit like"))?;

        Ok((
            Like {
                user,
                post,
                created_at: timestamp_from_millis(row.get("created_at")),
            },
            created,
        ))
    }

    async fn delete_like(&self, user: UserId, post: PostId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(user.value())
            .bind(post.value())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete like"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_likes(&self, post: PostId) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(post.value())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count likes"))?;

        Ok(row.get(0))
    }
}

#[async_trait]
impl NotificationRepository for SqliteDatabase {
    async fn create_notification(&self, new_notification: NewNotification) -> AppResult<Notification> {
        // The connection goes back to the pool before the read below
        let id = {
            let mut conn = self.pool.acquire().await.map_err(db_error("acquire connection"))?;
            insert_notification(&mut conn, &new_notification).await?
        };

        self.get_notification(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Notification {} vanished after insert", id)))
    }

    async fn get_notification(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let row = sqlx::query(&format!("{} WHERE n.id = ?", NOTIFICATION_SELECT))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get notification"))?;

        Ok(row.as_ref().map(notification_from_row))
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        query: NotificationQuery,
    ) -> AppResult<Vec<Notification>> {
        let mut qb = QueryBuilder::<Sqlite>::new(NOTIFICATION_SELECT);
        qb.push(" WHERE n.recipient_id = ");
        qb.push_bind(recipient.value());
        if query.unread_only {
            qb.push(" AND n.is_read = 0");
        }
        qb.push(" ORDER BY n.timestamp DESC, n.id DESC LIMIT ");
        qb.push_bind(query.page.sql_limit());
        qb.push(" OFFSET ");
        qb.push_bind(query.page.sql_offset());

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list notifications"))?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_error("mark notification read"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_notification(id).await
    }
}
