//! Stateless highlight rendering

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::annotations::Annotation;
use crate::error::Result;
use crate::html::{inject_highlights, InjectionResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub content: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(render))
}

/// Overlay annotations on content without keeping a session
async fn render(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<InjectionResult>> {
    let Json(request) = payload?;
    let result = inject_highlights(
        &request.content,
        &request.annotations,
        &state.config().highlight,
    )?;
    Ok(Json(result))
}
