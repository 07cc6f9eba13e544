//! Render Engine
//!
//! Turns a [`Location`] into a stream of [`TreeChunk`]s. The screen shell is
//! emitted first, before any store access, with [`Node::Deferred`]
//! placeholders for the parts that need records. Those parts are fetched
//! concurrently and emitted as `Resolve` frames in completion order, followed
//! by a terminal `End`.
//!
//! A selected record that does not exist renders as "not found" content, not
//! as a failure. A store failure ends the stream with an error item, which
//! the transport turns into a terminal error frame.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, FuturesUnordered, Stream, StreamExt};
use futures_util::FutureExt;
use uuid::Uuid;
use vteacher_core::{
    Location, Mutation, Node, Record, RecordId, SlotId, StoreError, StreamErrorCode, TreeChunk,
};
use vteacher_storage::RecordStore;

/// Slot holding the records list.
pub const SIDEBAR_SLOT: SlotId = SlotId(1);

/// Slot holding the selected record.
pub const CONTENT_SLOT: SlotId = SlotId(2);

/// Placeholder shown in the content pane when nothing is selected.
pub const EMPTY_SELECTION_TEXT: &str = "Click a vteacher on the left to view something!";

/// Shown in the sidebar when the store holds no records.
pub const EMPTY_LIST_TEXT: &str = "No vteachers created yet!";

// ============================================================================
// ERRORS AND STREAM TYPES
// ============================================================================

/// Failure while producing a render stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RenderError {
    /// The terminal frame that reports this error to the client.
    pub fn to_chunk(&self) -> TreeChunk {
        let code = match self {
            RenderError::Store(StoreError::Unavailable { .. }) => StreamErrorCode::StoreUnavailable,
            RenderError::Store(StoreError::NotFound { .. }) => StreamErrorCode::InternalError,
        };
        TreeChunk::Error {
            code,
            message: self.to_string(),
        }
    }
}

pub type ChunkStream = BoxStream<'static, Result<TreeChunk, RenderError>>;

/// A render in progress: the resolved location is known up front, the chunks
/// are produced lazily as the stream is polled.
pub struct RenderStream {
    pub location: Location,
    pub request_id: Uuid,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for RenderStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderStream")
            .field("location", &self.location)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Renders screens against a record store.
pub struct RenderEngine<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for RenderEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> RenderEngine<S>
where
    S: RecordStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Full render of `location`.
    pub fn render(&self, location: Location) -> RenderStream {
        let request_id = Uuid::now_v7();
        let chunks: ChunkStream = Box::pin(render_chunks(
            Arc::clone(&self.store),
            location,
            request_id,
        ));

        RenderStream {
            location,
            request_id,
            chunks,
        }
    }

    /// Apply `mutation`, then render the resulting location.
    ///
    /// The write completes before the render begins, so the render observes
    /// it. Creating a record redirects to the new record; update and delete
    /// render the requested location. Updating or deleting a record that is
    /// already gone is not an error; the render shows it as not found.
    pub async fn mutate_and_render(
        &self,
        mutation: Mutation,
        requested: Location,
    ) -> Result<RenderStream, StoreError> {
        let kind = mutation.kind();
        let resolved = match mutation {
            Mutation::Create { input } => {
                let record = self.store.create(&input).await?;
                Location::selected(record.id)
            }
            Mutation::Update { id, input } => {
                match self.store.update(id, &input).await {
                    Ok(_) | Err(StoreError::NotFound { .. }) => {}
                    Err(err) => return Err(err),
                }
                requested
            }
            Mutation::Delete { id } => {
                match self.store.delete(id).await {
                    Ok(()) | Err(StoreError::NotFound { .. }) => {}
                    Err(err) => return Err(err),
                }
                requested
            }
        };
        tracing::info!(mutation = kind, resolved = %resolved.to_json(), "Mutation applied");
        Ok(self.render(resolved))
    }
}

fn render_chunks<S>(
    store: Arc<S>,
    location: Location,
    request_id: Uuid,
) -> impl Stream<Item = Result<TreeChunk, RenderError>> + Send + 'static
where
    S: RecordStore + ?Sized + 'static,
{
    async_stream::try_stream! {
        tracing::debug!(%request_id, location = %location.to_json(), "Render started");
        yield TreeChunk::Root { node: screen_shell(location) };

        let mut pending: FuturesUnordered<BoxFuture<'static, Result<(SlotId, Node), StoreError>>> =
            FuturesUnordered::new();
        pending.push(render_sidebar(Arc::clone(&store), location).boxed());
        if let Some(id) = location.selected_id {
            pending.push(render_content(Arc::clone(&store), id).boxed());
        }

        while let Some(resolved) = pending.next().await {
            let (slot, node) = resolved?;
            tracing::debug!(%request_id, %slot, "Slot resolved");
            yield TreeChunk::Resolve { slot, node };
        }

        tracing::debug!(%request_id, "Render complete");
        yield TreeChunk::End;
    }
}

// ============================================================================
// SCREEN COMPOSITION
// ============================================================================

/// The synchronous part of a screen.
pub fn screen_shell(location: Location) -> Node {
    let key = location
        .selected_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());

    let content = match location.selected_id {
        Some(_) => Node::deferred(CONTENT_SLOT),
        None => Node::element("div")
            .attr("class", "vteacher--empty-state")
            .child(Node::text(EMPTY_SELECTION_TEXT)),
    };

    Node::element("div")
        .attr("class", "main")
        .child(
            Node::element("section")
                .attr("class", "col sidebar")
                .child(Node::deferred(SIDEBAR_SLOT)),
        )
        .child(
            Node::element("section")
                .attr("class", "col vteacher-viewer")
                .attr("key", key)
                .child(content),
        )
}

async fn render_sidebar<S>(store: Arc<S>, location: Location) -> Result<(SlotId, Node), StoreError>
where
    S: RecordStore + ?Sized,
{
    let records = store.list().await?;
    Ok((SIDEBAR_SLOT, sidebar_list(&records, location.selected_id)))
}

async fn render_content<S>(store: Arc<S>, id: RecordId) -> Result<(SlotId, Node), StoreError>
where
    S: RecordStore + ?Sized,
{
    let node = match store.get(id).await? {
        Some(record) => record_detail(&record),
        None => not_found_content(id),
    };
    Ok((CONTENT_SLOT, node))
}

/// Records list, newest first as returned by the store.
pub fn sidebar_list(records: &[Record], selected: Option<RecordId>) -> Node {
    if records.is_empty() {
        return Node::element("div")
            .attr("class", "vteachers-empty")
            .child(Node::text(EMPTY_LIST_TEXT));
    }

    let items = records.iter().map(|record| {
        let class = if Some(record.id) == selected {
            "sidebar-vteacher-list-item active"
        } else {
            "sidebar-vteacher-list-item"
        };
        Node::element("li").attr("data-id", record.id.to_string()).child(
            Node::element("header")
                .attr("class", class)
                .child(Node::element("strong").child(Node::text(record.title.clone())))
                .child(
                    Node::element("small")
                        .child(Node::text(record.updated_at.format("%-m/%-d/%y").to_string())),
                ),
        )
    });

    Node::element("ul")
        .attr("class", "vteachers-list")
        .children(items)
}

pub fn record_detail(record: &Record) -> Node {
    Node::element("div")
        .attr("class", "vteacher")
        .attr("data-id", record.id.to_string())
        .child(
            Node::element("div")
                .attr("class", "vteacher-header")
                .child(
                    Node::element("h1")
                        .attr("class", "vteacher-title")
                        .child(Node::text(record.title.clone())),
                )
                .child(Node::element("small").child(Node::text(format!(
                    "Last updated on {}",
                    record.updated_at.format("%-d %b %Y at %-I:%M %p")
                )))),
        )
        .child(
            Node::element("div")
                .attr("class", "vteacher-preview")
                .child(Node::text(record.body.clone())),
        )
}

/// Degraded content for a selected id with no record behind it.
pub fn not_found_content(id: RecordId) -> Node {
    Node::element("div")
        .attr("class", "vteacher--empty-state")
        .attr("data-status", "not-found")
        .child(Node::text(format!("Vteacher {} not found", id)))
}
