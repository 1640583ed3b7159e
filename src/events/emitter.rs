use std::fmt;
use thiserror::Error;

use super::event::Event;

/// Abstract event outlet the traversal engine writes progress into.
///
/// Implementations must be non-blocking: the engine emits from the middle of
/// a run and must never stall on a slow consumer.
pub trait EventEmitter: Send + Sync + fmt::Debug {
    fn emit(&self, event: Event) -> Result<(), EmitterError>;
}

/// Errors that can occur when emitting an event.
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("event channel closed")]
    Closed,
}

/// Emitter backed by a flume channel, for in-process consumers and tests
/// that want every event in emission order.
#[derive(Clone, Debug)]
pub struct ChannelEmitter {
    tx: flume::Sender<Event>,
}

impl ChannelEmitter {
    pub fn new(tx: flume::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Convenience pair: emitter plus its receiving end.
    pub fn unbounded() -> (Self, flume::Receiver<Event>) {
        let (tx, rx) = flume::unbounded();
        (Self::new(tx), rx)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: Event) -> Result<(), EmitterError> {
        self.tx.send(event).map_err(|_| EmitterError::Closed)
    }
}

/// Emitter that discards everything. Used for synchronous runs, where the
/// caller blocks on the final result and nobody watches progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn emit(&self, _event: Event) -> Result<(), EmitterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_emitter_preserves_order() {
        let (emitter, rx) = ChannelEmitter::unbounded();
        emitter.emit(Event::progress("rotate", "Starting: rotate")).unwrap();
        emitter.emit(Event::progress("merge", "Starting: merge")).unwrap();
        let scopes: Vec<_> = rx.drain().map(|e| e.scope_label().to_string()).collect();
        assert_eq!(scopes, ["rotate", "merge"]);
    }

    #[test]
    fn channel_emitter_reports_disconnect() {
        let (emitter, rx) = ChannelEmitter::unbounded();
        drop(rx);
        assert!(matches!(
            emitter.emit(Event::diagnostic("x", "y")),
            Err(EmitterError::Closed)
        ));
    }
}
