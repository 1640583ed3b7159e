use std::sync::Arc;

use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::{self, Receiver, Sender};

use super::emitter::{EmitterError, EventEmitter};
use super::event::Event;

const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast fan-out point for one workflow session's events.
///
/// Subscribers created before or during a run observe events strictly in
/// emission order. A subscriber that falls more than the buffer capacity
/// behind skips the lagged span and keeps receiving.
#[derive(Debug)]
pub struct EventHub {
    sender: Sender<Event>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Publish an event to every current subscriber.
    ///
    /// Publishing with no subscribers is not an error; background runs make
    /// progress whether or not anyone is watching.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(self: &Arc<Self>) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn emitter(self: &Arc<Self>) -> HubEmitter {
        HubEmitter {
            hub: Arc::clone(self),
        }
    }
}

/// Cloneable emitter handle over an [`EventHub`].
#[derive(Clone, Debug)]
pub struct HubEmitter {
    hub: Arc<EventHub>,
}

impl EventEmitter for HubEmitter {
    fn emit(&self, event: Event) -> Result<(), EmitterError> {
        self.hub.publish(event);
        Ok(())
    }
}

/// One subscription to a session's event feed.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<Event>,
}

impl EventStream {
    /// Receive the next event, skipping over any lagged span.
    ///
    /// Returns `None` once the hub is dropped and the buffer drained.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "progress subscriber lagged; skipping");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt into an async stream that ends after the stream-end diagnostic
    /// (or when the hub is dropped).
    pub fn into_terminated_stream(self) -> impl Stream<Item = Event> + Send {
        stream::unfold((self, false), |(mut events, done)| async move {
            if done {
                return None;
            }
            let event = events.recv().await?;
            let done = event.is_stream_end();
            Some((event, (events, done)))
        })
    }
}
