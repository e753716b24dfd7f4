//! Content document API routes
//!
//! Loading content into a document is the content-loaded signal for its
//! reader session.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::put,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::html::HighlightError;
use crate::reader::SessionSnapshot;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoadDocument {
    pub content: String,
}

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/:name",
        put(load_document).get(get_document).delete(delete_document),
    )
}

/// Load (or reload) a document's content
async fn load_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: std::result::Result<Json<LoadDocument>, JsonRejection>,
) -> Result<Json<SessionSnapshot>> {
    let Json(body) = payload?;
    let session = state.sessions().open(&name).await;
    let mut session = session.lock().await;
    session.content_loaded(body.content)?;

    let snapshot = session
        .snapshot()
        .ok_or_else(|| AppError::Internal(format!("Session {} lost its content", name)))?;
    Ok(Json(snapshot))
}

/// Get a document's current content, markers included
async fn get_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SessionSnapshot>> {
    let session = state
        .sessions()
        .get(&name)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Document not loaded: {}", name)))?;

    let snapshot = session.lock().await.snapshot().ok_or(HighlightError::NotReady)?;
    Ok(Json(snapshot))
}

/// Drop a document and its session
async fn delete_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    if state.sessions().remove(&name).await {
        tracing::info!(resource = %name, "Document unloaded");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Document not loaded: {}", name)))
    }
}
