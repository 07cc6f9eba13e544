//! Scripted render transport for cache and navigation tests.
//!
//! Every request is handed to the test as a [`PendingRender`]; the test
//! decides when and how it answers, chunk by chunk.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::{mpsc, oneshot};
use vteacher_client::{ClientError, RenderFuture, RenderResponse, RenderTransport};
use vteacher_core::{Location, Mutation, Node, SlotId, TreeChunk};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Render(Location),
    Mutate(Mutation, Location),
}

type Answer = Result<(Location, mpsc::UnboundedReceiver<Result<TreeChunk, ClientError>>), ClientError>;

pub struct PendingRender {
    pub call: Call,
    answer: oneshot::Sender<Answer>,
}

impl PendingRender {
    /// Accept the request as `location` and return a handle for its chunks.
    pub fn respond(self, location: Location) -> StreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.answer.send(Ok((location, rx)));
        StreamHandle { tx }
    }

    /// Answer with a full screen for `location` in one go.
    pub fn respond_with_screen(self, location: Location, label: &str) -> StreamHandle {
        let stream = self.respond(location);
        stream.send_screen(label);
        stream
    }

    pub fn fail(self, err: ClientError) {
        let _ = self.answer.send(Err(err));
    }

    /// The request this render was created for, as a location.
    pub fn location(&self) -> Location {
        match &self.call {
            Call::Render(location) | Call::Mutate(_, location) => *location,
        }
    }
}

pub struct StreamHandle {
    tx: mpsc::UnboundedSender<Result<TreeChunk, ClientError>>,
}

impl StreamHandle {
    /// Send a chunk. Returns false once the client has dropped the stream.
    pub fn send(&self, chunk: TreeChunk) -> bool {
        self.tx.send(Ok(chunk)).is_ok()
    }

    pub fn send_error(&self, err: ClientError) -> bool {
        self.tx.send(Err(err)).is_ok()
    }

    /// Root with one deferred slot, the slot, then End.
    pub fn send_screen(&self, label: &str) {
        self.send(shell_chunk());
        self.send(label_chunk(label));
        self.send(TreeChunk::End);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the client drops its end of the stream.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

pub const LABEL_SLOT: SlotId = SlotId(1);

pub fn shell_chunk() -> TreeChunk {
    TreeChunk::Root {
        node: Node::element("main").child(Node::deferred(LABEL_SLOT)),
    }
}

pub fn label_chunk(label: &str) -> TreeChunk {
    TreeChunk::Resolve {
        slot: LABEL_SLOT,
        node: Node::text(label),
    }
}

pub struct ScriptedTransport {
    requests: mpsc::UnboundedSender<PendingRender>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> (Arc<Self>, Renders) {
        let (requests, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            requests,
            calls: AtomicUsize::new(0),
        });
        (transport, Renders { rx })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn request(&self, call: Call) -> Result<RenderResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (answer, response) = oneshot::channel();
        self.requests
            .send(PendingRender { call, answer })
            .map_err(|_| ClientError::TransportFailure("test harness gone".to_string()))?;
        let (location, mut rx) = response
            .await
            .map_err(|_| ClientError::TransportFailure("render never answered".to_string()))??;
        let chunks = async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        };
        Ok(RenderResponse {
            location,
            chunks: Box::pin(chunks),
        })
    }
}

#[async_trait]
impl RenderTransport for ScriptedTransport {
    async fn render(&self, location: Location) -> Result<RenderResponse, ClientError> {
        self.request(Call::Render(location)).await
    }

    async fn mutate(
        &self,
        mutation: Mutation,
        requested: Location,
    ) -> Result<RenderResponse, ClientError> {
        self.request(Call::Mutate(mutation, requested)).await
    }
}

/// Cache factory rendering `location` through `transport`.
pub fn render_with(transport: &Arc<ScriptedTransport>, location: Location) -> impl FnOnce() -> RenderFuture {
    let transport = Arc::clone(transport);
    move || async move { transport.render(location).await }.boxed()
}

/// Cache factory applying `mutation` through `transport`.
pub fn mutate_with(
    transport: &Arc<ScriptedTransport>,
    mutation: Mutation,
    requested: Location,
) -> impl FnOnce() -> RenderFuture {
    let transport = Arc::clone(transport);
    move || async move { transport.mutate(mutation, requested).await }.boxed()
}

/// Requests issued by the code under test, in order.
pub struct Renders {
    rx: mpsc::UnboundedReceiver<PendingRender>,
}

impl Renders {
    pub async fn next(&mut self) -> PendingRender {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("a render request within 5s")
            .expect("transport alive")
    }

    /// True if no request is waiting right now.
    pub fn is_idle(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
