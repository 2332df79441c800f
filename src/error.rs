//! Error taxonomy for the narration engine.
//!
//! Generation and playback failures are converted into a [`PlaybackFault`] at
//! the controller boundary and stored in the playback state; they never cross
//! into the UI as panics. Illegal commands surface as [`InvalidStateError`].

use crate::player::Transport;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// The text-to-speech boundary did not yield playable audio.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("speech request failed: {0}")]
    Network(String),
    #[error("speech service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("speech service returned an empty audio payload")]
    EmptyPayload,
}

/// The media primitive could not load or play an attached resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("resource {0} is not registered or was already revoked")]
    UnknownResource(String),
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("audio output failed: {0}")]
    Output(String),
    #[error("no resource attached")]
    NothingAttached,
}

/// A command was issued in a state where it has no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    #[error("no tracks loaded")]
    NoTracks,
    #[error("cannot {command} while {transport}")]
    Transport {
        command: &'static str,
        transport: Transport,
    },
    #[error("already at the {0} track")]
    AtBoundary(Boundary),
    #[error("track index {index} out of range for {count} tracks")]
    OutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    First,
    Last,
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Boundary::First => "first",
            Boundary::Last => "last",
        };
        write!(f, "{}", label)
    }
}

/// The stored `last_error` of a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "kind", content = "cause", rename_all = "snake_case")]
#[ts(export)]
pub enum PlaybackFault {
    Generation(String),
    Playback(String),
}

impl PlaybackFault {
    pub fn message(&self) -> String {
        match self {
            PlaybackFault::Generation(cause) => format!("Could not generate narration: {cause}"),
            PlaybackFault::Playback(cause) => format!("Could not play narration: {cause}"),
        }
    }
}

impl From<GenerationError> for PlaybackFault {
    fn from(err: GenerationError) -> Self {
        PlaybackFault::Generation(err.to_string())
    }
}

impl From<PlaybackError> for PlaybackFault {
    fn from(err: PlaybackError) -> Self {
        PlaybackFault::Playback(err.to_string())
    }
}
