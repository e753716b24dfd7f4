//! Highlight API routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::annotations::{Annotation, Highlight};
use crate::error::{AppError, Result};
use crate::html::{BatchReport, PlacedHighlight};
use crate::reader::SharedSession;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

/// Create the highlights router, mounted beside the documents router
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/:name/highlights",
        post(place_highlight)
            .put(apply_annotations)
            .delete(remove_highlights),
    )
}

async fn loaded_session(state: &AppState, name: &str) -> Result<SharedSession> {
    state
        .sessions()
        .get(name)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Document not loaded: {}", name)))
}

/// Place a single highlight
async fn place_highlight(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: std::result::Result<Json<Highlight>, JsonRejection>,
) -> Result<Json<PlacedHighlight>> {
    let Json(highlight) = payload?;
    let session = loaded_session(&state, &name).await?;
    let placed = session.lock().await.place_highlight(&highlight)?;
    Ok(Json(placed))
}

/// Replace all highlights with a set of annotations
async fn apply_annotations(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: std::result::Result<Json<Vec<Annotation>>, JsonRejection>,
) -> Result<Json<BatchReport>> {
    let Json(annotations) = payload?;
    let session = loaded_session(&state, &name).await?;
    let report = session.lock().await.apply_annotations(&annotations)?;
    Ok(Json(report))
}

/// Remove every highlight
async fn remove_highlights(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RemovedResponse>> {
    let session = loaded_session(&state, &name).await?;
    let removed = session.lock().await.remove_highlights()?;
    Ok(Json(RemovedResponse { removed }))
}
