// ViewerContext extractors - handlers take `Vc` when they need a user, `MaybeVc` when anonymous is fine

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    core::UserId,
    error::AppError,
    infrastructure::viewer::ViewerContext,
};

fn viewer_from_parts(parts: &Parts) -> Result<Arc<ViewerContext>, AppError> {
    parts
        .extensions
        .get::<Arc<ViewerContext>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("ViewerContext middleware not installed".to_string()))
}

/// Authenticated viewer. Extraction fails with 401 for anonymous requests.
#[derive(Debug, Clone)]
pub struct Vc {
    inner: Arc<ViewerContext>,
    user_id: UserId,
}

impl Vc {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

// Access ViewerContext fields directly, e.g. vc.request_id
impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = viewer_from_parts(parts).and_then(|inner| {
            let user_id = inner.require_user()?;
            Ok(Vc { inner, user_id })
        });

        async move { vc }
    }
}

/// Possibly-anonymous viewer, for public reads.
#[derive(Debug, Clone)]
pub struct MaybeVc(pub Arc<ViewerContext>);

impl std::ops::Deref for MaybeVc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for MaybeVc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = viewer_from_parts(parts).map(MaybeVc);
        async move { vc }
    }
}
