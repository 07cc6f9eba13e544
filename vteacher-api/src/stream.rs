//! Stream Transport
//!
//! Serves a [`RenderStream`] as an HTTP response. The resolved location goes
//! out in the `X-Location` header with the status line; the body is an
//! NDJSON stream fed by a spawned pump task through a bounded channel.
//!
//! When the client goes away the body, and with it the channel receiver, is
//! dropped. The pump notices on its next send, stops, and drops the render
//! stream so no further store work is done for that request.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;
use vteacher_core::{
    encode_frame, FrameError, StreamErrorCode, TreeChunk, LOCATION_HEADER, STREAM_CONTENT_TYPE,
};

use crate::error::{ApiError, ApiResult};
use crate::render::{ChunkStream, RenderStream};

type FrameSender = mpsc::Sender<Result<Bytes, Infallible>>;

/// How a pump run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// A terminal frame was delivered to the channel.
    Completed { frames: usize },
    /// The receiver was dropped before the stream finished.
    Cancelled { frames: usize },
}

/// Build the streaming response for a render.
pub fn stream_response(render: RenderStream, buffer: usize) -> ApiResult<Response> {
    let RenderStream {
        location,
        request_id,
        chunks,
    } = render;

    let encoded = location.encode();
    let location_value = HeaderValue::from_str(&encoded).map_err(|e| {
        ApiError::internal_error(format!("Location {} is not a valid header: {}", encoded, e))
    })?;

    let (tx, rx) = mpsc::channel(buffer.max(1));
    tokio::spawn(pump(chunks, tx, request_id));

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(STREAM_CONTENT_TYPE)),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        (header::HeaderName::from_static(LOCATION_HEADER), location_value),
    ];
    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Drive `chunks` into `tx` until a terminal frame or until the receiver is
/// dropped.
pub async fn pump(mut chunks: ChunkStream, tx: FrameSender, request_id: Uuid) -> PumpOutcome {
    let mut frames = 0usize;

    while let Some(item) = chunks.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(%request_id, error = %err, "Render failed mid-stream");
                err.to_chunk()
            }
        };
        let Some((frame, terminal)) = frame_for(&chunk, encode_frame(&chunk), request_id) else {
            break;
        };

        if tx.send(Ok(frame)).await.is_err() {
            tracing::debug!(%request_id, frames, "Client disconnected, render cancelled");
            return PumpOutcome::Cancelled { frames };
        }
        frames += 1;

        if terminal {
            tracing::debug!(%request_id, frames, "Render stream delivered");
            return PumpOutcome::Completed { frames };
        }
    }

    tracing::warn!(%request_id, frames, "Render stream ended without a terminal frame");
    PumpOutcome::Completed { frames }
}

/// The frame to send for `chunk` and whether it ends the stream.
///
/// A chunk that fails to encode is replaced by a terminal `INTERNAL_ERROR`
/// frame, so nothing is sent after it.
fn frame_for(
    chunk: &TreeChunk,
    encoded: Result<Bytes, FrameError>,
    request_id: Uuid,
) -> Option<(Bytes, bool)> {
    match encoded {
        Ok(frame) => Some((frame, chunk.is_terminal())),
        Err(err) => {
            tracing::error!(%request_id, error = %err, "Frame encoding failed");
            let fallback = TreeChunk::Error {
                code: StreamErrorCode::InternalError,
                message: "Failed to encode render output".to_string(),
            };
            encode_frame(&fallback).ok().map(|frame| (frame, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use futures_util::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vteacher_core::{FrameDecoder, Node, StoreError};

    fn chunk_stream(items: Vec<Result<TreeChunk, RenderError>>) -> ChunkStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_pump_delivers_until_terminal() {
        let (tx, mut rx) = mpsc::channel(8);
        let chunks = chunk_stream(vec![
            Ok(TreeChunk::Root { node: Node::text("shell") }),
            Ok(TreeChunk::End),
            Ok(TreeChunk::Root { node: Node::text("never sent") }),
        ]);

        let outcome = pump(chunks, tx, Uuid::now_v7()).await;
        assert_eq!(outcome, PumpOutcome::Completed { frames: 2 });

        let mut decoder = FrameDecoder::new();
        let mut decoded = Vec::new();
        while let Some(Ok(frame)) = rx.recv().await {
            decoded.extend(decoder.push(&frame).unwrap());
        }
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1], TreeChunk::End);
    }

    #[tokio::test]
    async fn test_pump_turns_errors_into_terminal_frame() {
        let (tx, mut rx) = mpsc::channel(8);
        let chunks = chunk_stream(vec![
            Ok(TreeChunk::Root { node: Node::text("shell") }),
            Err(RenderError::Store(StoreError::unavailable("db down"))),
        ]);

        let outcome = pump(chunks, tx, Uuid::now_v7()).await;
        assert_eq!(outcome, PumpOutcome::Completed { frames: 2 });

        rx.recv().await;
        let frame = rx.recv().await.unwrap().unwrap();
        let decoded = FrameDecoder::new().push(&frame).unwrap();
        assert!(matches!(
            decoded[0],
            TreeChunk::Error {
                code: StreamErrorCode::StoreUnavailable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_pump_stops_when_receiver_dropped() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polled);
        let endless: ChunkStream = Box::pin(stream::repeat_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(TreeChunk::Resolve {
                slot: vteacher_core::SlotId(1),
                node: Node::text("tick"),
            })
        }));

        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(pump(endless, tx, Uuid::now_v7()));
        assert!(rx.recv().await.is_some());
        drop(rx);

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, PumpOutcome::Cancelled { .. }));
        let polled_at_cancel = polled.load(Ordering::SeqCst);
        tokio::task::yield_now().await;
        assert_eq!(polled.load(Ordering::SeqCst), polled_at_cancel);
    }

    #[test]
    fn test_encode_failure_ends_stream_with_internal_error() {
        let shell = TreeChunk::Root { node: Node::text("shell") };
        let failed = Err(FrameError::Encode {
            reason: "unrepresentable".to_string(),
        });

        let (frame, terminal) = frame_for(&shell, failed, Uuid::now_v7()).unwrap();
        assert!(terminal);
        let decoded = FrameDecoder::new().push(&frame).unwrap();
        assert!(matches!(
            decoded[0],
            TreeChunk::Error {
                code: StreamErrorCode::InternalError,
                ..
            }
        ));

        let (_, terminal) = frame_for(&shell, encode_frame(&shell), Uuid::now_v7()).unwrap();
        assert!(!terminal);
    }
}
