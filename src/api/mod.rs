// HTTP surface - one handler per route, all sharing AppState

pub mod accounts;
pub mod comments;
pub mod feed;
pub mod health;
pub mod notifications;
pub mod posts;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::middleware::viewer_context_middleware,
    models::Page,
};

/// `?limit=&offset=` on list routes. No limit means the whole list.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> Page {
        page_of(self.limit, self.offset)
    }
}

// Query strings can't use #[serde(flatten)] with numbers, so list params repeat limit/offset
pub(crate) fn page_of(limit: Option<u32>, offset: Option<u32>) -> Page {
    Page {
        limit,
        offset: offset.unwrap_or(0),
    }
}

pub(crate) fn required<T>(field: &str, value: Option<T>) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(format!("{}: This field is required.", field)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/register", post(accounts::register_handler))
        .route("/login", post(accounts::login_handler))
        .route(
            "/profile",
            get(accounts::get_profile_handler)
                .put(accounts::update_profile_handler)
                .patch(accounts::update_profile_handler)
                .delete(accounts::delete_account_handler),
        )
        .route("/users/{id}", get(accounts::get_user_handler))
        .route("/users/{id}/follow", post(accounts::follow_handler))
        .route("/users/{id}/unfollow", post(accounts::unfollow_handler))
        // Posts
        .route(
            "/posts",
            get(posts::list_posts_handler).post(posts::create_post_handler),
        )
        .route(
            "/posts/{id}",
            get(posts::get_post_handler)
                .put(posts::replace_post_handler)
                .patch(posts::update_post_handler)
                .delete(posts::delete_post_handler),
        )
        .route("/posts/{id}/like", post(posts::like_handler))
        .route("/posts/{id}/unlike", post(posts::unlike_handler))
        // Comments
        .route(
            "/comments",
            get(comments::list_comments_handler).post(comments::create_comment_handler),
        )
        .route(
            "/comments/{id}",
            get(comments::get_comment_handler)
                .put(comments::update_comment_handler)
                .patch(comments::update_comment_handler)
                .delete(comments::delete_comment_handler),
        )
        // Feed and notifications
        .route("/feed", get(feed::feed_handler))
        .route("/notifications", get(notifications::list_notifications_handler))
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_read_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    viewer_context_middleware::<AppState>,
                )),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_default_to_everything() {
        assert_eq!(PageParams::default().page(), Page::all());
        let params = PageParams {
            limit: Some(5),
            offset: Some(10),
        };
        assert_eq!(params.page(), Page::new(5, 10));
    }

    #[test]
    fn test_required_field() {
        assert_eq!(required("title", Some(3)).unwrap(), 3);
        let err = required::<String>("title", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg == "title: This field is required."));
    }
}
