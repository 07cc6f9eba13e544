//! VTeacher Core - Shared Types
//!
//! Data types shared by the server and the client: navigation locations and
//! their codec, the record model, the render tree and the stream framing.
//! No I/O lives here.

pub mod error;
pub mod location;
pub mod record;
pub mod tree;
pub mod wire;

pub use error::{FrameError, LocationError, StoreError, StoreResult};
pub use location::Location;
pub use record::{Mutation, Record, RecordId, RecordInput, Timestamp};
pub use tree::{Node, SlotId, StreamErrorCode, TreeChunk};
pub use wire::{encode_frame, FrameDecoder, LOCATION_HEADER, STREAM_CONTENT_TYPE};
