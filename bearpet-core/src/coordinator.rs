//! Chat request lifecycle.
//!
//! The coordinator owns the question/response state slice. It decides
//! whether a submission goes out, numbers it, and applies the single
//! terminal outcome each submission eventually produces.

use crate::chat::ChatOutcome;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Observable request state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestState {
    /// The most recently accepted question.
    pub input_text: String,
    /// Text shown in the response area.
    pub response_text: String,
    /// True while the latest submission has no outcome yet.
    pub is_pending: bool,
}

/// What happened to an outcome handed to [`Coordinator::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outcome was written to the response area.
    Applied,
    /// A newer submission exists; the outcome was dropped.
    Discarded {
        /// Sequence number of the newest submission.
        latest: u64,
    },
    /// No request with this sequence number is in flight.
    Unknown,
}

/// Owner of the request state slice.
#[derive(Debug, Clone)]
pub struct Coordinator {
    state: RequestState,
    placeholder: String,
    discard_stale: bool,
    latest: u64,
    in_flight: HashSet<u64>,
}

impl Coordinator {
    /// Create an idle coordinator.
    pub fn new(placeholder: impl Into<String>, discard_stale: bool) -> Self {
        Self {
            state: RequestState::default(),
            placeholder: placeholder.into(),
            discard_stale,
            latest: 0,
            in_flight: HashSet::new(),
        }
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Sequence number of the newest submission (0 before the first).
    pub fn latest(&self) -> u64 {
        self.latest
    }

    /// Number of requests still waiting for an outcome.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Accept a question.
    ///
    /// Returns the new sequence number, or `None` if `text` is empty or only
    /// whitespace, in which case nothing changes and no request may be sent.
    pub fn submit(&mut self, text: &str) -> Option<u64> {
        if text.trim().is_empty() {
            debug!("rejecting blank submission");
            return None;
        }

        self.latest += 1;
        self.in_flight.insert(self.latest);
        self.state = RequestState {
            input_text: text.to_string(),
            response_text: self.placeholder.clone(),
            is_pending: true,
        };
        debug!(seq = self.latest, in_flight = self.in_flight.len(), "submission accepted");
        Some(self.latest)
    }

    /// Apply the terminal outcome of submission `seq`.
    ///
    /// Each sequence number is accepted once; later calls return
    /// `Completion::Unknown`.
    pub fn complete(&mut self, seq: u64, outcome: &ChatOutcome) -> Completion {
        if !self.in_flight.remove(&seq) {
            warn!(seq, "outcome for a request that is not in flight");
            return Completion::Unknown;
        }

        if self.discard_stale && seq != self.latest {
            debug!(seq, latest = self.latest, kind = outcome.kind(), "discarding stale outcome");
            return Completion::Discarded {
                latest: self.latest,
            };
        }

        self.state.response_text = outcome.response_text();
        self.state.is_pending = false;
        debug!(seq, kind = outcome.kind(), "outcome applied");
        Completion::Applied
    }
}
