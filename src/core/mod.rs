// Core types and primitives

pub mod strong_types;

pub use strong_types::{
    current_time_millis, timestamp_from_millis, CommentId, NotificationId, PostId, UserId,
};
