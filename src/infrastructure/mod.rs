// Core infrastructure modules
pub mod cache; // LRU cache used for token lookups
pub mod middleware; // Viewer context middleware and extractors
pub mod repositories; // Repository bundle handed to services
pub mod security; // Password hashing and bearer tokens
pub mod sqlite_database; // SQLite implementation of the repositories
pub mod traits; // Repository interfaces
pub mod viewer; // Viewer context

pub use cache::Cache;
pub use repositories::Repositories;
pub use security::{PasswordHasher, TokenAuthenticator};
pub use sqlite_database::SqliteDatabase;
pub use traits::{
    CommentRepository, LikeRepository, NotificationRepository, PostRepository, TokenRepository,
    UserRepository,
};
pub use viewer::ViewerContext;
