//! Progress events and their distribution.
//!
//! The traversal engine reports progress as structured [`Event`]s through an
//! [`EventEmitter`]. A per-session broadcast [`EventHub`] fans events out to
//! any number of subscribers ([`EventStream`]), which is how polling clients
//! and the SSE endpoint observe a background run.

pub mod emitter;
pub mod event;
pub mod hub;

pub use emitter::{ChannelEmitter, EmitterError, EventEmitter, NullEmitter};
pub use event::{DiagnosticEvent, Event, OperationEvent, STREAM_END_SCOPE};
pub use hub::{EventHub, EventStream, HubEmitter};
