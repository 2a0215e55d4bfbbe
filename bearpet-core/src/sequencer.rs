//! Tap-triggered animation sequencer.
//!
//! The sequencer is a plain state machine with no timers of its own:
//! `Idle -> Reacting(0) -> ... -> Reacting(N-1) -> Idle`. The pet loop
//! feeds it taps and "clip elapsed" ticks from a chained timer task.

use crate::clip::{ClipId, ClipSpec};
use serde::Serialize;
use tracing::{debug, warn};

/// Where the sequencer is in a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Showing the idle clip.
    Idle,
    /// Showing the reaction clip at this index.
    Reacting(usize),
}

/// Observable animation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimationState {
    /// The clip currently displayed.
    pub current_clip: ClipId,
    /// True while a reaction sequence is in progress.
    pub is_reacting: bool,
}

/// Result of feeding an elapsed tick to the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Moved on to the next reaction clip.
    Next {
        /// Index of the clip now playing.
        index: usize,
        /// The clip now playing.
        clip: ClipId,
    },
    /// The last clip finished; back to idle.
    Finished,
    /// The tick did not belong to the current phase.
    Ignored,
}

/// The animation state machine.
#[derive(Debug, Clone)]
pub struct Sequencer {
    clips: ClipSpec,
    phase: Phase,
    /// Number of reactions started so far; doubles as the current reaction's id.
    reactions: u64,
}

impl Sequencer {
    /// Create a sequencer showing the idle clip.
    pub fn new(clips: ClipSpec) -> Self {
        Self {
            clips,
            phase: Phase::Idle,
            reactions: 0,
        }
    }

    /// The clip set being played.
    pub fn clips(&self) -> &ClipSpec {
        &self.clips
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Id of the current (or most recent) reaction.
    pub fn reaction(&self) -> u64 {
        self.reactions
    }

    /// Whether a reaction is in progress.
    pub fn is_reacting(&self) -> bool {
        matches!(self.phase, Phase::Reacting(_))
    }

    /// The clip currently displayed.
    pub fn current_clip(&self) -> &ClipId {
        match self.phase {
            Phase::Idle => self.clips.idle(),
            Phase::Reacting(index) => &self.clips.reaction()[index].id,
        }
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> AnimationState {
        AnimationState {
            current_clip: self.current_clip().clone(),
            is_reacting: self.is_reacting(),
        }
    }

    /// Handle a tap on the character.
    ///
    /// Starts a reaction and returns its id, or returns `None` when a
    /// reaction is already playing.
    pub fn tap(&mut self) -> Option<u64> {
        if self.is_reacting() {
            debug!(reaction = self.reactions, "tap ignored while reacting");
            return None;
        }

        self.reactions += 1;
        self.phase = Phase::Reacting(0);
        debug!(reaction = self.reactions, clip = %self.current_clip(), "reaction started");
        Some(self.reactions)
    }

    /// Handle the end of clip `index` of reaction `reaction`.
    pub fn clip_elapsed(&mut self, reaction: u64, index: usize) -> Step {
        let current = match self.phase {
            Phase::Reacting(current) if reaction == self.reactions && current == index => current,
            phase => {
                warn!(reaction, index, ?phase, "ignoring clip tick for another phase");
                return Step::Ignored;
            }
        };

        let next = current + 1;
        if next < self.clips.reaction().len() {
            self.phase = Phase::Reacting(next);
            debug!(reaction, index = next, clip = %self.current_clip(), "next clip");
            Step::Next {
                index: next,
                clip: self.current_clip().clone(),
            }
        } else {
            self.phase = Phase::Idle;
            debug!(reaction, "reaction finished");
            Step::Finished
        }
    }
}
