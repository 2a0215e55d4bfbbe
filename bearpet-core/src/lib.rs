//! bearpet core library
//!
//! This crate provides the logic behind the bearpet desktop companion: the
//! tap-triggered clip sequencer, the chat request lifecycle, the chat
//! transport, configuration, and the single-threaded loop that applies every
//! state change.

pub mod chat;
pub mod clip;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod pet;
pub mod sequencer;

pub use chat::{ChatMessage, ChatOutcome, ChatRequest, ChatTransport, HttpTransport};
pub use clip::{Clip, ClipId, ClipSpec};
pub use config::{Config, API_KEY_ENV};
pub use coordinator::RequestState;
pub use error::{Error, Result};
pub use event::{Event, EventReceiver, EventSender};
pub use pet::{Pet, PetHandle, PetState};
pub use sequencer::AnimationState;
