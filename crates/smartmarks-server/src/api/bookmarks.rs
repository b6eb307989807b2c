use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use smartmarks_core::{Bookmark, BookmarkId, MutationBoundary, NewBookmark};
use uuid::Uuid;

use crate::auth::RequestAuth;
use crate::error::AppError;
use crate::AppState;

/// The caller's bookmarks, newest first
async fn list_bookmarks(
    State(state): State<AppState>,
    auth: RequestAuth,
) -> Result<Json<Vec<Bookmark>>, AppError> {
    let user = auth.require_user("view bookmarks")?;
    let bookmarks = state.service.list(&user.id).await?;
    Ok(Json(bookmarks))
}

/// Create a bookmark for the caller
async fn create_bookmark(
    State(state): State<AppState>,
    auth: RequestAuth,
    payload: Result<Json<NewBookmark>, JsonRejection>,
) -> Result<(StatusCode, Json<Bookmark>), AppError> {
    let Json(req) = payload?;
    let mutations = state.service.for_user(auth.user().cloned());
    let bookmark = mutations.create(&req.url, &req.title).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// Delete one of the caller's bookmarks
async fn delete_bookmark(
    State(state): State<AppState>,
    auth: RequestAuth,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    let mutations = state.service.for_user(auth.user().cloned());
    mutations.remove(BookmarkId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route("/api/bookmarks/{id}", delete(delete_bookmark))
}
