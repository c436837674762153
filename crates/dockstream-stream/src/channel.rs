//! Subscriber channel: the one-way sink a session writes messages into.
//!
//! [`subscriber_channel`] pairs a bounded mpsc sender with a
//! [`SubscriberStream`] for the transport. The stream holds a drop guard on
//! the session's cancellation token, so the moment the transport drops it
//! (client disconnected) the token is set, before the receiver goes away.
//! The emitter relies on that ordering to tell a disconnect from a broken
//! channel without inspecting channel errors.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::message::Message;

/// Failure reported by a sink when a message could not be written.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The receiving side is gone.
    #[error("subscriber channel closed")]
    Closed,
    /// The sink failed for another reason.
    #[error("subscriber channel broken: {0}")]
    Broken(String),
}

/// Ordered, possibly closable destination for session messages.
#[async_trait]
pub trait SubscriberSink: Send + Sync {
    /// Writes one message, waiting for capacity if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be written.
    async fn deliver(&self, message: Message) -> Result<(), SinkError>;
}

#[async_trait]
impl SubscriberSink for mpsc::Sender<Message> {
    async fn deliver(&self, message: Message) -> Result<(), SinkError> {
        self.send(message).await.map_err(|_| SinkError::Closed)
    }
}

/// Receiving half of a subscriber channel, handed to the transport.
///
/// Dropping it cancels the session it was created for.
#[derive(Debug)]
pub struct SubscriberStream {
    // Declared first: the token is cancelled before the receiver is dropped.
    _disconnect: DropGuard,
    inner: ReceiverStream<Message>,
}

impl Stream for SubscriberStream {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Creates a subscriber channel buffering up to `capacity` messages.
///
/// Returns the sink for the session, the stream for the transport, and the
/// cancellation token that the stream sets when dropped.
#[must_use]
pub fn subscriber_channel(
    capacity: usize,
) -> (mpsc::Sender<Message>, SubscriberStream, CancellationToken) {
    with_token(capacity, CancellationToken::new())
}

/// Like [`subscriber_channel`], but the returned token is a child of
/// `parent`: cancelling `parent` (server shutdown) stops the session too.
#[must_use]
pub fn child_subscriber_channel(
    parent: &CancellationToken,
    capacity: usize,
) -> (mpsc::Sender<Message>, SubscriberStream, CancellationToken) {
    with_token(capacity, parent.child_token())
}

fn with_token(
    capacity: usize,
    cancel: CancellationToken,
) -> (mpsc::Sender<Message>, SubscriberStream, CancellationToken) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stream = SubscriberStream {
        _disconnect: cancel.clone().drop_guard(),
        inner: ReceiverStream::new(rx),
    };
    (tx, stream, cancel)
}
