use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use crate::{
    api::{page_of, required},
    app_state::AppState,
    core::{CommentId, PostId},
    error::AppResult,
    infrastructure::middleware::{MaybeVc, Vc},
    models::{Comment, CommentUpdate},
    privacy::{self, Action, Resource},
};

#[derive(Debug, Deserialize)]
pub struct ListCommentsParams {
    pub post: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post: Option<i64>,
    pub content: Option<String>,
}

pub async fn list_comments_handler(
    State(state): State<AppState>,
    params: Result<Query<ListCommentsParams>, QueryRejection>,
) -> AppResult<Json<Vec<Comment>>> {
    let Query(params) = params?;
    let comments = state
        .comments
        .list_comments(params.post.map(PostId::new), page_of(params.limit, params.offset))
        .await?;
    Ok(Json(comments))
}

pub async fn create_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let post = required("post", request.post)?;
    let content = required("content", request.content)?;

    let comment = state
        .comments
        .create_comment(vc.user_id(), PostId::new(post), content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment_handler(
    State(state): State<AppState>,
    vc: MaybeVc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Comment>> {
    let Path(id) = id?;
    let comment = state.comments.get_comment(CommentId::new(id)).await?;
    privacy::ensure(vc.user_id, Action::Read, &Resource::from(&comment))?;
    Ok(Json(comment))
}

/// Content is the only editable field, so PUT and PATCH behave the same.
pub async fn update_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CommentUpdate>, JsonRejection>,
) -> AppResult<Json<Comment>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let comment = state
        .comments
        .update_comment(vc.user_id(), CommentId::new(id), update)
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    state.comments.delete_comment(vc.user_id(), CommentId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
