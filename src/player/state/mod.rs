mod constants;
mod store;

pub(crate) use constants::{MAX_PROGRESS_PERCENT, MAX_VOLUME, MIN_VOLUME};
pub use store::{PlaybackStore, StatePatch};

use serde::Serialize;
use ts_rs::TS;

/// Phase of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Transport {
    #[default]
    Idle,
    Generating,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Transport::Idle => "idle",
            Transport::Generating => "generating",
            Transport::Ready => "ready",
            Transport::Playing => "playing",
            Transport::Paused => "paused",
            Transport::Ended => "ended",
            Transport::Error => "error",
        };
        write!(f, "{}", label)
    }
}
