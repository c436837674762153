//! # Serialized poll-and-emit loop for one session.
//!
//! ```text
//! emit Loading
//! loop {
//!   ├─► wait for tick (or cancellation)
//!   ├─► poll (raced against cancellation, panics caught)
//!   │     ├─► NoChange          → nothing
//!   │     ├─► Changed(s)        → emit Transmitting(s)
//!   │     └─► RecoverableError  → emit ErrorOccurred
//!   └─► SubscriberGone → stop, Fault → return Err
//! }
//! ```
//!
//! ## Rules
//! - Polls run **sequentially**: the next tick is awaited only after the
//!   previous cycle emitted its message.
//! - A cycle slower than the interval is followed immediately by the next
//!   one; missed ticks are not replayed in a burst.
//! - The first tick fires right away, so the first fetch follows `Loading`
//!   without waiting a full interval.
//! - Cancellation is checked before each poll and at each delivery. A poll
//!   in flight when the token is set is dropped and its result discarded.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use dockstream_common::error::StreamError;
use dockstream_common::types::SessionId;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::channel::SubscriberSink;
use crate::emitter::{Delivery, Emitter};
use crate::message::Message;
use crate::session::SessionPhase;

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The snapshot is digest-equal to the last transmitted one.
    NoChange,
    /// A new snapshot to transmit.
    Changed(serde_json::Value),
    /// The cycle failed; the session keeps running.
    RecoverableError(String),
}

/// One step of a session's work, invoked once per tick.
#[async_trait]
pub trait Poller: Send {
    /// Runs one poll cycle.
    async fn poll(&mut self) -> PollOutcome;
}

/// Shortest accepted tick; shorter intervals (including zero) are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Drives a [`Poller`] at a fixed interval.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    session: SessionId,
    phase: Option<watch::Sender<SessionPhase>>,
}

impl Scheduler {
    /// Creates a scheduler ticking every `interval`, at least [`MIN_INTERVAL`].
    pub fn new(interval: Duration, session: SessionId) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            session,
            phase: None,
        }
    }

    /// Publishes lifecycle transitions to `phase`.
    #[must_use]
    pub fn with_phase(mut self, phase: watch::Sender<SessionPhase>) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Runs until cancellation, subscriber loss, or a delivery fault.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::DeliveryFault` if the channel broke while the
    /// subscriber was still connected. Subscriber loss and cancellation end
    /// the loop with `Ok(())`.
    pub async fn run<P, S>(
        &self,
        poller: &mut P,
        emitter: &Emitter<S>,
        cancel: &CancellationToken,
    ) -> Result<(), StreamError>
    where
        P: Poller,
        S: SubscriberSink,
    {
        let result = self.drive(poller, emitter, cancel).await;
        match &result {
            Ok(()) => self.set_phase(SessionPhase::Stopped),
            Err(_) => self.set_phase(SessionPhase::Faulted),
        }
        result
    }

    async fn drive<P, S>(
        &self,
        poller: &mut P,
        emitter: &Emitter<S>,
        cancel: &CancellationToken,
    ) -> Result<(), StreamError>
    where
        P: Poller,
        S: SubscriberSink,
    {
        match emitter.try_send(Message::Loading).await {
            Delivery::Delivered => self.set_phase(SessionPhase::Running),
            Delivery::SubscriberGone => return Ok(()),
            Delivery::Fault(e) => return Err(e),
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if cancel.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                outcome = self.guarded_poll(poller) => outcome,
            };

            let message = match outcome {
                PollOutcome::NoChange => continue,
                PollOutcome::Changed(contents) => Message::Transmitting { contents },
                PollOutcome::RecoverableError(reason) => Message::ErrorOccurred { reason },
            };

            match emitter.try_send(message).await {
                Delivery::Delivered => {}
                Delivery::SubscriberGone => break,
                Delivery::Fault(e) => return Err(e),
            }
        }

        tracing::debug!(session = %self.session, "scheduler stopped");
        Ok(())
    }

    async fn guarded_poll<P: Poller>(&self, poller: &mut P) -> PollOutcome {
        match AssertUnwindSafe(poller.poll()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic_err) => {
                let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!(session = %self.session, panic = %info, "poll panicked");
                PollOutcome::RecoverableError(format!("poll failed: {info}"))
            }
        }
    }

    fn set_phase(&self, next: SessionPhase) {
        if let Some(phase) = &self.phase {
            let previous = phase.send_replace(next);
            tracing::debug!(session = %self.session, from = %previous, to = %next, "session phase");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::channel::subscriber_channel;

    const TICK: Duration = Duration::from_millis(500);

    enum Step {
        Outcome(PollOutcome),
        Panic,
        Slow(Duration, PollOutcome),
    }

    struct ScriptedPoller {
        steps: VecDeque<Step>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedPoller {
        fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let poller = Self {
                steps: steps.into(),
                calls: Arc::clone(&calls),
            };
            (poller, calls)
        }
    }

    #[async_trait]
    impl Poller for ScriptedPoller {
        async fn poll(&mut self) -> PollOutcome {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.steps.pop_front() {
                Some(Step::Outcome(outcome)) => outcome,
                Some(Step::Panic) => panic!("fetcher exploded"),
                Some(Step::Slow(delay, outcome)) => {
                    time::sleep(delay).await;
                    outcome
                }
                None => PollOutcome::NoChange,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn emits_loading_then_outcomes_in_order() {
        let (sink, mut stream, cancel) = subscriber_channel(8);
        let (mut poller, _calls) = ScriptedPoller::new(vec![
            Step::Outcome(PollOutcome::Changed(json!(1))),
            Step::Outcome(PollOutcome::NoChange),
            Step::Outcome(PollOutcome::RecoverableError("boom".into())),
            Step::Outcome(PollOutcome::Changed(json!(2))),
        ]);
        let session = SessionId::generate();
        let emitter = Emitter::new(sink, cancel.clone(), session);
        let task = tokio::spawn(async move {
            Scheduler::new(TICK, session)
                .run(&mut poller, &emitter, &cancel)
                .await
        });

        assert_eq!(stream.next().await, Some(Message::Loading));
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting { contents: json!(1) })
        );
        assert_eq!(
            stream.next().await,
            Some(Message::ErrorOccurred {
                reason: "boom".into()
            })
        );
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting { contents: json!(2) })
        );

        drop(stream);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn panic_in_poll_is_reported_and_loop_continues() {
        let (sink, mut stream, cancel) = subscriber_channel(8);
        let (mut poller, _calls) = ScriptedPoller::new(vec![
            Step::Panic,
            Step::Outcome(PollOutcome::Changed(json!("after"))),
        ]);
        let session = SessionId::generate();
        let emitter = Emitter::new(sink, cancel.clone(), session);
        let task = tokio::spawn(async move {
            Scheduler::new(TICK, session)
                .run(&mut poller, &emitter, &cancel)
                .await
        });

        assert_eq!(stream.next().await, Some(Message::Loading));
        assert_eq!(
            stream.next().await,
            Some(Message::ErrorOccurred {
                reason: "poll failed: fetcher exploded".into()
            })
        );
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting {
                contents: json!("after")
            })
        );

        drop(stream);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_poll_delays_next_cycle_instead_of_overlapping() {
        let (sink, mut stream, cancel) = subscriber_channel(8);
        let (mut poller, calls) = ScriptedPoller::new(vec![
            Step::Slow(TICK * 3, PollOutcome::Changed(json!("slow"))),
            Step::Outcome(PollOutcome::Changed(json!("next"))),
        ]);
        let session = SessionId::generate();
        let emitter = Emitter::new(sink, cancel.clone(), session);
        let task = tokio::spawn(async move {
            Scheduler::new(TICK, session)
                .run(&mut poller, &emitter, &cancel)
                .await
        });

        assert_eq!(stream.next().await, Some(Message::Loading));
        let started = time::Instant::now();
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting {
                contents: json!("slow")
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting {
                contents: json!("next")
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < TICK * 4);

        drop(stream);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn no_poll_after_cancellation() {
        let (sink, mut stream, cancel) = subscriber_channel(8);
        let (mut poller, calls) = ScriptedPoller::new(vec![]);
        let session = SessionId::generate();
        let emitter = Emitter::new(sink, cancel.clone(), session);
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            Scheduler::new(TICK, session)
                .run(&mut poller, &emitter, &loop_cancel)
                .await
        });

        assert_eq!(stream.next().await, Some(Message::Loading));
        time::sleep(TICK * 2).await;
        cancel.cancel();
        assert!(task.await.unwrap().is_ok());

        let before = calls.load(Ordering::SeqCst);
        time::sleep(TICK * 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_minimum() {
        let (sink, mut stream, cancel) = subscriber_channel(8);
        let (mut poller, calls) = ScriptedPoller::new(vec![
            Step::Outcome(PollOutcome::Changed(json!("a"))),
            Step::Outcome(PollOutcome::Changed(json!("b"))),
        ]);
        let session = SessionId::generate();
        let scheduler = Scheduler::new(Duration::ZERO, session);
        assert_eq!(scheduler.interval, MIN_INTERVAL);

        let emitter = Emitter::new(sink, cancel.clone(), session);
        let task = tokio::spawn(async move { scheduler.run(&mut poller, &emitter, &cancel).await });

        assert_eq!(stream.next().await, Some(Message::Loading));
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting { contents: json!("a") })
        );
        assert_eq!(
            stream.next().await,
            Some(Message::Transmitting { contents: json!("b") })
        );
        assert!(calls.load(Ordering::SeqCst) >= 2);

        drop(stream);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn phase_follows_lifecycle() {
        let (sink, mut stream, cancel) = subscriber_channel(8);
        let (mut poller, _calls) = ScriptedPoller::new(vec![]);
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Starting);
        let session = SessionId::generate();
        let emitter = Emitter::new(sink, cancel.clone(), session);
        let task = tokio::spawn(async move {
            Scheduler::new(TICK, session)
                .with_phase(phase_tx)
                .run(&mut poller, &emitter, &cancel)
                .await
        });

        assert_eq!(stream.next().await, Some(Message::Loading));
        time::sleep(TICK).await;
        assert_eq!(*phase_rx.borrow(), SessionPhase::Running);

        drop(stream);
        assert!(task.await.unwrap().is_ok());
        assert_eq!(*phase_rx.borrow(), SessionPhase::Stopped);
    }
}
