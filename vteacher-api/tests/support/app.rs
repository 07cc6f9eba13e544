//! Router and body helpers shared by the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use futures_util::StreamExt;
use tower::ServiceExt;
use vteacher_api::{create_api_router, AppState, DynRecordStore, ServerConfig};
use vteacher_core::{FrameDecoder, Location, TreeChunk, LOCATION_HEADER};

pub fn test_router(store: Arc<DynRecordStore>) -> Router {
    create_api_router(AppState::new(store, 16), &ServerConfig::default())
}

pub fn with_location(path: &str, location: Location) -> String {
    format!("{}?location={}", path, location.encode())
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.expect("router is infallible")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("valid request")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn location_header(response: &Response<Body>) -> Location {
    let value = response
        .headers()
        .get(LOCATION_HEADER)
        .expect("x-location header present")
        .to_str()
        .expect("ascii header");
    Location::decode(value).expect("decodable location")
}

/// Read a whole render stream body.
pub async fn read_chunks(response: Response<Body>) -> Vec<TreeChunk> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let mut decoder = FrameDecoder::new();
    let chunks = decoder.push(&bytes).expect("well-formed frames");
    decoder.finish().expect("no trailing partial frame");
    chunks
}

/// Pull frames from a streaming body one data chunk at a time.
pub struct ChunkReader {
    body: axum::body::BodyDataStream,
    decoder: FrameDecoder,
    ready: std::collections::VecDeque<TreeChunk>,
}

impl ChunkReader {
    pub fn new(response: Response<Body>) -> Self {
        Self {
            body: response.into_body().into_data_stream(),
            decoder: FrameDecoder::new(),
            ready: Default::default(),
        }
    }

    pub async fn next(&mut self) -> Option<TreeChunk> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(chunk);
            }
            let bytes = self.body.next().await?.expect("body readable");
            self.ready
                .extend(self.decoder.push(&bytes).expect("well-formed frames"));
        }
    }
}

/// Concatenated text of every resolved slot.
pub fn resolved_text(chunks: &[TreeChunk]) -> String {
    chunks
        .iter()
        .filter_map(|chunk| match chunk {
            TreeChunk::Resolve { node, .. } => Some(node.text_content()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
