//! Event system for the bearpet companion.
//!
//! The pet loop reports every state change it applies through this
//! channel-based system, so front ends only ever render what the loop has
//! already decided.

use crate::chat::ChatOutcome;
use crate::clip::ClipId;
use tokio::sync::mpsc;

/// Events emitted by the pet loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// The loop has started and is showing the idle clip.
    Started {
        /// The idle clip.
        idle_clip: ClipId,
    },

    /// A tap started a reaction.
    ReactionStarted {
        /// Reaction id.
        reaction: u64,
        /// Number of clips in the reaction.
        clips: usize,
    },

    /// A tap arrived while a reaction was playing and was ignored.
    TapIgnored,

    /// The displayed clip changed.
    ClipChanged {
        /// The clip now displayed.
        clip: ClipId,
        /// Index within the reaction, or `None` for the idle clip.
        index: Option<usize>,
    },

    /// The last reaction clip finished and the idle clip is back.
    ReactionFinished {
        /// Reaction id.
        reaction: u64,
    },

    /// A blank question was rejected without sending anything.
    InputRejected,

    /// A question was sent and the placeholder is showing.
    Thinking {
        /// Sequence number of the submission.
        seq: u64,
        /// The placeholder text now shown.
        placeholder: String,
    },

    /// A submission's outcome was written to the response area.
    ResponseReady {
        /// Sequence number of the submission.
        seq: u64,
        /// The terminal outcome.
        outcome: ChatOutcome,
        /// The text now shown.
        text: String,
    },

    /// A submission's outcome arrived after a newer submission and was dropped.
    ResponseDiscarded {
        /// Sequence number of the dropped submission.
        seq: u64,
        /// Sequence number of the newest submission.
        latest: u64,
    },

    /// Warning message.
    Warning {
        /// The warning message.
        message: String,
    },

    /// The loop has stopped.
    Stopped,
}

/// Sender for events.
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiver for events.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create a new event channel.
///
/// The channel is unbounded: sending never waits, so a slow or idle
/// receiver cannot hold up the pet loop.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

impl Event {
    /// Create a warning event with the given message.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_creation() {
        let (tx, mut rx) = channel();
        tx.send(Event::TapIgnored).unwrap();
        assert!(matches!(rx.try_recv(), Ok(Event::TapIgnored)));
    }

    #[test]
    fn test_send_does_not_wait_for_receiver() {
        let (tx, rx) = channel();
        for _ in 0..1_000 {
            tx.send(Event::TapIgnored).unwrap();
        }
        assert_eq!(rx.len(), 1_000);
    }

    #[test]
    fn test_warning_constructor() {
        let warning = Event::warning("be careful");
        assert!(matches!(warning, Event::Warning { message } if message == "be careful"));
    }
}
