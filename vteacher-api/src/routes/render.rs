//! Screen render route.

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};

use super::LocationQuery;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::stream::stream_response;

/// GET /react?location=<encoded> - Stream the screen for a location
pub async fn render_screen(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Response> {
    let location = query.resolve()?;
    stream_response(state.engine.render(location), state.stream_buffer)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/react", get(render_screen))
}
