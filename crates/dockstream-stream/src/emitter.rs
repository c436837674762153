//! Safe delivery of messages to a subscriber.

use dockstream_common::error::StreamError;
use dockstream_common::types::SessionId;
use tokio_util::sync::CancellationToken;

use crate::channel::SubscriberSink;
use crate::message::Message;

/// Result of one delivery attempt.
#[derive(Debug)]
pub enum Delivery {
    /// The message was written to the channel.
    Delivered,
    /// The subscriber disconnected; the session should stop silently.
    SubscriberGone,
    /// The channel failed while the subscriber was still connected.
    Fault(StreamError),
}

/// Writes messages to a sink, telling a disconnect apart from a fault.
///
/// A disconnect is recognised only through the cancellation token the
/// route layer sets. The token is checked before writing, raced against a
/// write that is waiting for capacity, and checked again when a write fails.
#[derive(Debug)]
pub struct Emitter<S> {
    sink: S,
    cancel: CancellationToken,
    session: SessionId,
}

impl<S: SubscriberSink> Emitter<S> {
    /// Creates an emitter writing to `sink` on behalf of `session`.
    pub fn new(sink: S, cancel: CancellationToken, session: SessionId) -> Self {
        Self {
            sink,
            cancel,
            session,
        }
    }

    /// Attempts to deliver one message.
    pub async fn try_send(&self, message: Message) -> Delivery {
        if self.cancel.is_cancelled() {
            return Delivery::SubscriberGone;
        }
        let kind = message.kind();

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Delivery::SubscriberGone,
            result = self.sink.deliver(message) => result,
        };

        match result {
            Ok(()) => {
                tracing::trace!(session = %self.session, kind, "message delivered");
                Delivery::Delivered
            }
            Err(_) if self.cancel.is_cancelled() => Delivery::SubscriberGone,
            Err(e) => {
                tracing::error!(session = %self.session, kind, error = %e, "delivery fault");
                Delivery::Fault(StreamError::DeliveryFault {
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::channel::{SinkError, subscriber_channel};

    struct BrokenSink;

    #[async_trait]
    impl SubscriberSink for BrokenSink {
        async fn deliver(&self, _message: Message) -> Result<(), SinkError> {
            Err(SinkError::Broken("connection reset".into()))
        }
    }

    struct RecordingSink(Mutex<Vec<Message>>);

    #[async_trait]
    impl SubscriberSink for RecordingSink {
        async fn deliver(&self, message: Message) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_while_connected() {
        let sink = RecordingSink(Mutex::new(Vec::new()));
        let emitter = Emitter::new(sink, CancellationToken::new(), SessionId::generate());
        assert!(matches!(
            emitter.try_send(Message::Loading).await,
            Delivery::Delivered
        ));
        assert_eq!(emitter.sink.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_means_subscriber_gone_without_writing() {
        let sink = RecordingSink(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let emitter = Emitter::new(sink, cancel, SessionId::generate());

        assert!(matches!(
            emitter.try_send(Message::Loading).await,
            Delivery::SubscriberGone
        ));
        assert!(emitter.sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_subscriber_stream_is_subscriber_gone() {
        let (sink, stream, cancel) = subscriber_channel(1);
        let emitter = Emitter::new(sink, cancel, SessionId::generate());
        drop(stream);
        assert!(matches!(
            emitter.try_send(Message::Loading).await,
            Delivery::SubscriberGone
        ));
    }

    #[tokio::test]
    async fn closed_channel_without_disconnect_is_a_fault() {
        let (sink, rx) = mpsc::channel::<Message>(1);
        drop(rx);
        let emitter = Emitter::new(sink, CancellationToken::new(), SessionId::generate());
        assert!(matches!(
            emitter.try_send(Message::Loading).await,
            Delivery::Fault(StreamError::DeliveryFault { .. })
        ));
    }

    #[tokio::test]
    async fn broken_sink_is_a_fault() {
        let emitter = Emitter::new(BrokenSink, CancellationToken::new(), SessionId::generate());
        match emitter.try_send(Message::Loading).await {
            Delivery::Fault(e) => assert!(e.to_string().contains("connection reset")),
            other => panic!("unexpected delivery: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_blocked_write() {
        let (sink, _stream_kept_alive, cancel) = subscriber_channel(1);
        let emitter = Emitter::new(sink, cancel.clone(), SessionId::generate());
        assert!(matches!(
            emitter.try_send(Message::Loading).await,
            Delivery::Delivered
        ));

        let canceller = tokio::spawn(async move {
            tokio::task::yield_now().await;
            cancel.cancel();
        });
        assert!(matches!(
            emitter.try_send(Message::Loading).await,
            Delivery::SubscriberGone
        ));
        canceller.await.unwrap();
    }
}
