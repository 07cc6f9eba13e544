//! Record routes
//!
//! Mutations answer with a render stream for the resulting location, so the
//! client gets the updated screen in the same round trip. Plain reads answer
//! with JSON.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use vteacher_core::{Mutation, Record, RecordId, RecordInput};
use vteacher_storage::RecordStore;

use super::LocationQuery;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::stream::stream_response;

fn parse_id(raw: &str) -> ApiResult<RecordId> {
    raw.parse::<RecordId>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid record id: {}", raw)))
}

async fn mutate(state: &AppState, mutation: Mutation, query: &LocationQuery) -> ApiResult<Response> {
    let requested = query.resolve()?;
    let render = state.engine.mutate_and_render(mutation, requested).await?;
    stream_response(render, state.stream_buffer)
}

/// POST /vteachers?location=<encoded> - Create a record and render it
pub async fn create_record(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
    Json(input): Json<RecordInput>,
) -> ApiResult<Response> {
    mutate(&state, Mutation::Create { input }, &query).await
}

/// PUT /vteachers/{id}?location=<encoded> - Update a record and re-render
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LocationQuery>,
    Json(input): Json<RecordInput>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    mutate(&state, Mutation::Update { id, input }, &query).await
}

/// DELETE /vteachers/{id}?location=<encoded> - Delete a record and re-render
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    mutate(&state, Mutation::Delete { id }, &query).await
}

/// GET /vteachers - All records, newest first
pub async fn list_records(State(state): State<AppState>) -> ApiResult<Json<Vec<Record>>> {
    Ok(Json(state.store().list().await?))
}

/// GET /vteachers/{id} - One record, or `null`
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Record>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.store().get(id).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/vteachers", get(list_records).post(create_record))
        .route(
            "/vteachers/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}
