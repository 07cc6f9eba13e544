//! Render transport: requesting a screen and reading its chunk stream.
//!
//! [`RenderTransport`] is the seam between the cache and the network. The
//! HTTP implementation speaks NDJSON over reqwest; tests substitute a scripted
//! transport.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use futures_util::future::BoxFuture;
use vteacher_api::error::{ApiError as ApiServerError, ErrorCode};
use vteacher_core::{FrameDecoder, Location, Mutation, TreeChunk, LOCATION_HEADER};

use crate::config::ClientConfig;
use crate::error::ClientError;

pub type ChunkStream = BoxStream<'static, Result<TreeChunk, ClientError>>;

/// Future returned by cache factories.
pub type RenderFuture = BoxFuture<'static, Result<RenderResponse, ClientError>>;

/// An accepted render: the location the server resolved plus its chunks.
pub struct RenderResponse {
    pub location: Location,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for RenderResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderResponse")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait RenderTransport: Send + Sync + 'static {
    /// Render the screen at `location`.
    async fn render(&self, location: Location) -> Result<RenderResponse, ClientError>;

    /// Apply `mutation` and render the resulting screen. `requested` is the
    /// location the caller expects to land on; the server may redirect.
    async fn mutate(
        &self,
        mutation: Mutation,
        requested: Location,
    ) -> Result<RenderResponse, ClientError>;
}

// ============================================================================
// HTTP TRANSPORT
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpRenderTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRenderTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RenderTransport for HttpRenderTransport {
    async fn render(&self, location: Location) -> Result<RenderResponse, ClientError> {
        tracing::debug!(location = %location.to_json(), "requesting render");
        let response = self
            .client
            .get(self.url("/react"))
            .query(&[("location", location.to_json())])
            .send()
            .await?;
        open_stream(response).await
    }

    async fn mutate(
        &self,
        mutation: Mutation,
        requested: Location,
    ) -> Result<RenderResponse, ClientError> {
        tracing::debug!(kind = mutation.kind(), location = %requested.to_json(), "sending mutation");
        let query = [("location", requested.to_json())];
        let request = match mutation {
            Mutation::Create { input } => self.client.post(self.url("/vteachers")).json(&input),
            Mutation::Update { id, input } => self
                .client
                .put(self.url(&format!("/vteachers/{}", id)))
                .json(&input),
            Mutation::Delete { id } => self.client.delete(self.url(&format!("/vteachers/{}", id))),
        };
        let response = request.query(&query).send().await?;
        open_stream(response).await
    }
}

/// Check the status and location header, then hand back the body as chunks.
async fn open_stream(response: reqwest::Response) -> Result<RenderResponse, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    let header = response
        .headers()
        .get(LOCATION_HEADER)
        .ok_or_else(|| ClientError::InvalidResponse("missing X-Location header".to_string()))?;
    let header = header
        .to_str()
        .map_err(|e| ClientError::InvalidResponse(format!("X-Location header: {}", e)))?;
    let location = Location::decode(header)
        .map_err(|e| ClientError::InvalidResponse(format!("X-Location header: {}", e)))?;

    Ok(RenderResponse {
        location,
        chunks: Box::pin(decode_body(response)),
    })
}

fn decode_body(
    response: reqwest::Response,
) -> impl Stream<Item = Result<TreeChunk, ClientError>> + Send + 'static {
    async_stream::try_stream! {
        let mut body = response.bytes_stream();
        let mut decoder = FrameDecoder::new();
        while let Some(piece) = body.next().await {
            let piece = piece?;
            for chunk in decoder.push(&piece)? {
                yield chunk;
            }
        }
        decoder.finish()?;
    }
}

async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => return ClientError::from(err),
    };
    match serde_json::from_str::<ApiServerError>(&text) {
        Ok(api_error) => match api_error.code {
            ErrorCode::MalformedLocation => ClientError::MalformedLocation(api_error.message),
            ErrorCode::StoreUnavailable => ClientError::StoreUnavailable(api_error.message),
            code => ClientError::TransportFailure(format!("{}: {}", code, api_error.message)),
        },
        Err(_) => ClientError::TransportFailure(format!("HTTP {}: {}", status.as_u16(), text)),
    }
}
