use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};
use serde::Deserialize;

use crate::{
    api::page_of,
    app_state::AppState,
    core::NotificationId,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::{Notification, NotificationQuery},
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsParams {
    /// `?unread=true` keeps only unread notifications
    pub unread: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_notifications_handler(
    State(state): State<AppState>,
    vc: Vc,
    params: Result<Query<ListNotificationsParams>, QueryRejection>,
) -> AppResult<Json<Vec<Notification>>> {
    let Query(params) = params?;
    let query = NotificationQuery {
        unread_only: params.unread.unwrap_or(false),
        page: page_of(params.limit, params.offset),
    };
    Ok(Json(state.notifications.list_notifications(vc.user_id(), query).await?))
}

pub async fn mark_read_handler(
    State(state): State<AppState>,
    vc: Vc,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Notification>> {
    let Path(id) = id?;
    let notification = state
        .notifications
        .mark_read(vc.user_id(), NotificationId::new(id))
        .await?;
    Ok(Json(notification))
}
