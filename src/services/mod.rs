// Domain services - one per area, each holding only the repositories it reads and writes

pub mod accounts;
pub mod comments;
pub mod feed;
pub mod follow_graph;
pub mod notifications;
pub mod posts;

pub use accounts::{AccountService, AuthPayload, Registration};
pub use comments::CommentService;
pub use feed::FeedService;
pub use follow_graph::FollowService;
pub use notifications::NotificationService;
pub use posts::PostService;

use crate::error::{AppError, AppResult};

/// Rejects values that are empty once surrounding whitespace is removed.
pub(crate) fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{}: This field may not be blank.",
            field
        )));
    }
    Ok(())
}
