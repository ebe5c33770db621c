// Post routes, including like/unlike

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::{page_of, required},
    app_state::AppState,
    core::PostId,
    error::AppResult,
    infrastructure::middleware::{MaybeVc, Vc},
    models::{Post, PostQuery, PostUpdate},
    privacy::{self, Action, Resource},
    services::posts::{LIKED_MESSAGE, UNLIKED_MESSAGE},
};

#[derive(Debug, Deserialize)]
pub struct ListPostsParams {
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn list_posts_handler(
    State(state): State<AppState>,
    params: Result<Query<ListPostsParams>, QueryRejection>,
) -> AppResult<Json<Vec<Post>>> {
    let Query(params) = params?;
    let posts = state
        .posts
        .list_posts(PostQuery {
            search: params.search,
            page: page_of(params.limit, params.offset),
        })
        .await?;
    Ok(Json(posts))
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let title = required("title", request.title)?;
    let content = required("content", request.content)?;

    let post = state.posts.create_post(vc.user_id(), title, content).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post_handler(
    State(state): State<AppState>,
    vc: MaybeVc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Post>> {
    let Path(id) = id?;
    let post = state.posts.get_post(PostId::new(id)).await?;
    privacy::ensure(vc.user_id, Action::Read, &Resource::from(&post))?;
    Ok(Json(post))
}

/// PUT replaces both fields.
pub async fn replace_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> AppResult<Json<Post>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let update = PostUpdate {
        title: Some(required("title", request.title)?),
        content: Some(required("content", request.content)?),
    };

    let post = state.posts.update_post(vc.user_id(), PostId::new(id), update).await?;
    Ok(Json(post))
}

pub async fn update_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostUpdate>, JsonRejection>,
) -> AppResult<Json<Post>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let post = state.posts.update_post(vc.user_id(), PostId::new(id), update).await?;
    Ok(Json(post))
}

pub async fn delete_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    state.posts.delete_post(vc.user_id(), PostId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    let Path(id) = id?;
    state.posts.like(vc.user_id(), PostId::new(id)).await?;
    Ok(Json(json!({ "detail": LIKED_MESSAGE })))
}

pub async fn unlike_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    let Path(id) = id?;
    state.posts.unlike(vc.user_id(), PostId::new(id)).await?;
    Ok(Json(json!({ "detail": UNLIKED_MESSAGE })))
}
