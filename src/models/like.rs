use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{PostId, UserId};

/// One row of the like ledger. (user, post) is unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Like {
    pub user: UserId,
    pub post: PostId,
    pub created_at: DateTime<Utc>,
}
