use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
};

use crate::{
    api::PageParams,
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::Post,
};

pub async fn feed_handler(
    State(state): State<AppState>,
    vc: Vc,
    params: Result<Query<PageParams>, QueryRejection>,
) -> AppResult<Json<Vec<Post>>> {
    let Query(params) = params?;
    Ok(Json(state.feed.feed(vc.user_id(), params.page()).await?))
}
