// Account, profile and follow routes

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::required,
    app_state::AppState,
    core::UserId,
    error::AppResult,
    infrastructure::middleware::{MaybeVc, Vc},
    models::{ProfileUpdate, UserProfile},
    privacy::{self, Action, Resource},
    services::{
        follow_graph::{followed_message, unfollowed_message},
        AuthPayload, Registration,
    },
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let registration = Registration {
        username: required("username", request.username)?,
        password: required("password", request.password)?,
        email: request.email,
        bio: request.bio,
        profile_picture: request.profile_picture,
    };

    let auth = state.accounts.register(registration).await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthPayload>> {
    let Json(request) = payload?;
    let username = required("username", request.username)?;
    let password = required("password", request.password)?;

    let auth = state.accounts.login(&username, &password).await?;
    Ok(Json(auth))
}

pub async fn get_profile_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.accounts.get_profile(vc.user_id()).await?))
}

pub async fn update_profile_handler(
    State(state): State<AppState>,
    vc: Vc,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<UserProfile>> {
    let Json(update) = payload?;
    Ok(Json(state.accounts.update_profile(vc.user_id(), update).await?))
}

pub async fn delete_account_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> AppResult<StatusCode> {
    state.accounts.delete_account(vc.user_id()).await?;
    info!(request_id = %vc.request_id, "Account removed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    vc: MaybeVc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<UserProfile>> {
    let Path(id) = id?;
    let profile = state.accounts.get_user(UserId::new(id)).await?;
    privacy::ensure(vc.user_id, Action::Read, &Resource::from(&profile.user))?;
    Ok(Json(profile))
}

pub async fn follow_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    let Path(id) = id?;
    let followee = state.follows.follow(vc.user_id(), UserId::new(id)).await?;
    Ok(Json(json!({ "success": followed_message(&followee) })))
}

pub async fn unfollow_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    let Path(id) = id?;
    let followee = state.follows.unfollow(vc.user_id(), UserId::new(id)).await?;
    Ok(Json(json!({ "success": unfollowed_message(&followee) })))
}
