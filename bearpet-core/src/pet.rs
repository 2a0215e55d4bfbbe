//! The pet's state-update loop.
//!
//! This module provides the `Pet` struct, the single place where animation
//! and request state are mutated. Taps and questions arrive as commands from
//! a [`PetHandle`]; reaction timers and chat requests run as spawned tasks
//! that only post their results back. Every applied change is reported as an
//! [`Event`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::chat::{fetch_reply, ChatOutcome, ChatTransport};
use crate::config::Config;
use crate::coordinator::{Completion, Coordinator, RequestState};
use crate::error::{Error, Result};
use crate::event::{channel, Event, EventReceiver, EventSender};
use crate::sequencer::{AnimationState, Sequencer, Step};

/// Buffer size of the command channel.
const COMMAND_CHANNEL_SIZE: usize = 32;

/// Snapshot of both state slices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetState {
    /// Animation slice.
    pub animation: AnimationState,
    /// Request slice.
    pub request: RequestState,
}

/// Requests from the outside world.
#[derive(Debug)]
enum Command {
    Tap,
    Submit(String),
    Snapshot(oneshot::Sender<PetState>),
    Shutdown,
}

/// Results posted back by spawned tasks.
#[derive(Debug)]
enum Internal {
    ClipElapsed { reaction: u64, index: usize },
    ChatFinished { seq: u64, outcome: ChatOutcome },
}

/// Handle for driving a running pet.
///
/// Cheap to clone; the loop stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct PetHandle {
    commands: mpsc::Sender<Command>,
}

impl PetHandle {
    /// Tap the character.
    ///
    /// # Errors
    ///
    /// Returns `Error::Stopped` if the loop is no longer running.
    pub async fn tap(&self) -> Result<()> {
        self.send(Command::Tap).await
    }

    /// Submit a question.
    ///
    /// # Errors
    ///
    /// Returns `Error::Stopped` if the loop is no longer running.
    pub async fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::Submit(text.into())).await
    }

    /// Fetch the current state.
    ///
    /// The snapshot reflects every command sent through this handle before it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Stopped` if the loop is no longer running.
    pub async fn snapshot(&self) -> Result<PetState> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Ask the loop to stop.
    ///
    /// # Errors
    ///
    /// Returns `Error::Stopped` if the loop is no longer running.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).await.map_err(|_| Error::Stopped)
    }
}

/// The state-update loop.
pub struct Pet {
    config: Config,
    sequencer: Sequencer,
    coordinator: Coordinator,
    transport: Arc<dyn ChatTransport>,
    events: EventSender,
    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    tasks: JoinSet<()>,
}

impl Pet {
    /// Create a pet showing its idle clip.
    ///
    /// Returns a tuple of (Pet, EventReceiver, PetHandle).
    /// - The `Pet` is driven by awaiting [`Pet::run`].
    /// - The `EventReceiver` yields every applied state change.
    /// - The `PetHandle` sends taps and questions.
    pub fn new(
        config: Config,
        transport: Arc<dyn ChatTransport>,
    ) -> (Self, EventReceiver, PetHandle) {
        let (events, event_rx) = channel();
        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let coordinator =
            Coordinator::new(config.placeholder.clone(), config.discard_stale_responses);
        let pet = Self {
            sequencer: Sequencer::new(config.clips.clone()),
            coordinator,
            config,
            transport,
            events,
            commands,
            internal_tx,
            internal_rx,
            tasks: JoinSet::new(),
        };

        (pet, event_rx, PetHandle { commands: command_tx })
    }

    /// Snapshot of both state slices.
    pub fn state(&self) -> PetState {
        PetState {
            animation: self.sequencer.state(),
            request: self.coordinator.state().clone(),
        }
    }

    /// Run until shut down or until every handle is dropped.
    ///
    /// Outstanding timers and requests are aborted on exit. Returns the
    /// final state.
    pub async fn run(mut self) -> PetState {
        info!(idle = %self.sequencer.current_clip(), "pet started");
        let idle_clip = self.sequencer.current_clip().clone();
        self.emit(Event::Started { idle_clip });

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Tap) => self.on_tap(),
                    Some(Command::Submit(text)) => self.on_submit(text),
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.state());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(message) = self.internal_rx.recv() => match message {
                    Internal::ClipElapsed { reaction, index } => {
                        self.on_clip_elapsed(reaction, index)
                    }
                    Internal::ChatFinished { seq, outcome } => {
                        self.on_chat_finished(seq, outcome)
                    }
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!(error = %e, "background task panicked");
                            self.emit(Event::warning(format!("background task failed: {}", e)));
                        }
                    }
                }
            }
        }

        let outstanding = self.tasks.len();
        self.tasks.shutdown().await;
        info!(outstanding, "pet stopped");
        self.emit(Event::Stopped);
        self.state()
    }

    /// Never waits: the event channel is unbounded.
    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    fn on_tap(&mut self) {
        let Some(reaction) = self.sequencer.tap() else {
            self.emit(Event::TapIgnored);
            return;
        };

        let clips = self.sequencer.clips().reaction().len();
        self.emit(Event::ReactionStarted { reaction, clips });
        self.emit(Event::ClipChanged {
            clip: self.sequencer.current_clip().clone(),
            index: Some(0),
        });
        self.spawn_reaction_timer(reaction);
    }

    /// One task per reaction walks the clip durations in order. Deadlines
    /// are cumulative from the tap.
    fn spawn_reaction_timer(&mut self, reaction: u64) {
        let durations: Vec<_> = self
            .sequencer
            .clips()
            .reaction()
            .iter()
            .map(|clip| clip.duration)
            .collect();
        let tx = self.internal_tx.clone();
        let mut deadline = Instant::now();

        self.tasks.spawn(async move {
            for (index, duration) in durations.into_iter().enumerate() {
                deadline += duration;
                sleep_until(deadline).await;
                if tx.send(Internal::ClipElapsed { reaction, index }).is_err() {
                    break;
                }
            }
        });
    }

    fn on_clip_elapsed(&mut self, reaction: u64, index: usize) {
        match self.sequencer.clip_elapsed(reaction, index) {
            Step::Next { index, clip } => {
                self.emit(Event::ClipChanged {
                    clip,
                    index: Some(index),
                });
            }
            Step::Finished => {
                self.emit(Event::ClipChanged {
                    clip: self.sequencer.current_clip().clone(),
                    index: None,
                });
                self.emit(Event::ReactionFinished { reaction });
            }
            Step::Ignored => {}
        }
    }

    fn on_submit(&mut self, text: String) {
        let Some(seq) = self.coordinator.submit(&text) else {
            self.emit(Event::InputRejected);
            return;
        };

        self.emit(Event::Thinking {
            seq,
            placeholder: self.coordinator.state().response_text.clone(),
        });

        let request = self.config.chat_request(&text);
        let transport = Arc::clone(&self.transport);
        let tx = self.internal_tx.clone();
        debug!(seq, "sending chat request");

        self.tasks.spawn(async move {
            let outcome = fetch_reply(transport.as_ref(), &request).await;
            let _ = tx.send(Internal::ChatFinished { seq, outcome });
        });
    }

    fn on_chat_finished(&mut self, seq: u64, outcome: ChatOutcome) {
        info!(seq, kind = outcome.kind(), "chat request finished");
        match self.coordinator.complete(seq, &outcome) {
            Completion::Applied => {
                let text = self.coordinator.state().response_text.clone();
                self.emit(Event::ResponseReady { seq, outcome, text });
            }
            Completion::Discarded { latest } => {
                self.emit(Event::ResponseDiscarded { seq, latest });
            }
            Completion::Unknown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every request with the same body.
    struct CannedTransport {
        body: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for CannedTransport {
        async fn send(&self, _request: &crate::chat::ChatRequest) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.as_bytes().to_vec())
        }
    }

    fn canned(body: &'static str) -> Arc<CannedTransport> {
        Arc::new(CannedTransport {
            body,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_initial_state_is_idle() {
        let config = Config::new();
        let idle = config.clips.idle().clone();
        let (pet, _rx, _handle) = Pet::new(config, canned("{}"));

        let state = pet.state();
        assert_eq!(state.animation.current_clip, idle);
        assert!(!state.animation.is_reacting);
        assert!(!state.request.is_pending);
    }

    #[tokio::test]
    async fn test_shutdown_returns_final_state() {
        let (pet, mut rx, handle) = Pet::new(Config::new(), canned("{}"));
        let task = tokio::spawn(pet.run());

        handle.shutdown().await.unwrap();
        let state = task.await.unwrap();
        assert!(!state.animation.is_reacting);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(Event::Started { .. })));
        assert!(matches!(events.last(), Some(Event::Stopped)));
    }

    #[tokio::test]
    async fn test_loop_stops_when_handles_dropped() {
        let (pet, _rx, handle) = Pet::new(Config::new(), canned("{}"));
        let task = tokio::spawn(pet.run());
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_errors_after_stop() {
        let (pet, _rx, handle) = Pet::new(Config::new(), canned("{}"));
        let task = tokio::spawn(pet.run());
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(handle.tap().await, Err(Error::Stopped)));
        assert!(matches!(handle.snapshot().await, Err(Error::Stopped)));
    }

    #[tokio::test]
    async fn test_blank_submit_sends_nothing() {
        let transport = canned(r#"{"choices":[{"message":{"content":"hi"}}]}"#);
        let (pet, mut rx, handle) = Pet::new(Config::new(), transport.clone());
        let task = tokio::spawn(pet.run());

        handle.submit("").await.unwrap();
        handle.submit("   ").await.unwrap();
        let state = handle.snapshot().await.unwrap();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(!state.request.is_pending);
        assert_eq!(state.request.response_text, "");

        let mut rejected = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, Event::InputRejected) {
                rejected += 1;
            }
            assert!(!matches!(event, Event::Thinking { .. }));
        }
        assert_eq!(rejected, 2);
    }

    #[tokio::test]
    async fn test_submit_applies_reply() {
        let transport = canned(r#"{"choices":[{"message":{"content":"hi"}}]}"#);
        let (pet, mut rx, handle) = Pet::new(Config::new(), transport.clone());
        let task = tokio::spawn(pet.run());

        handle.submit("hello").await.unwrap();
        loop {
            match rx.recv().await {
                Some(Event::ResponseReady { seq, outcome, text }) => {
                    assert_eq!(seq, 1);
                    assert_eq!(outcome, ChatOutcome::Reply("hi".to_string()));
                    assert_eq!(text, "hi");
                    break;
                }
                Some(_) => continue,
                None => panic!("event channel closed early"),
            }
        }

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.request.response_text, "hi");
        assert_eq!(state.request.input_text, "hello");
        assert!(!state.request.is_pending);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_unread_events_do_not_stall_loop() {
        let (pet, _events, handle) = Pet::new(Config::new(), canned("{}"));
        let task = tokio::spawn(pet.run());

        for _ in 0..120 {
            handle.tap().await.unwrap();
        }
        for _ in 0..30 {
            handle.submit("").await.unwrap();
        }

        let state = tokio::time::timeout(Duration::from_secs(2), handle.snapshot())
            .await
            .expect("loop stopped answering")
            .unwrap();
        assert!(state.animation.is_reacting);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_event_receiver_keeps_loop_running() {
        let (pet, events, handle) = Pet::new(Config::new(), canned("{}"));
        drop(events);
        let task = tokio::spawn(pet.run());

        handle.tap().await.unwrap();
        let state = handle.snapshot().await.unwrap();
        assert!(state.animation.is_reacting);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
