//! Narration playback: state, controller, and the async engine around them.

mod messages;
mod state;
mod update;
mod view;

pub use messages::Command;
pub use state::{PlaybackStore, StatePatch, Transport};
pub use update::{
    AdvanceTicket, CommandResult, ControllerOptions, Effect, EngineHandle, GenerationOutcome,
    GenerationRequest, NarrationEngine, PlaybackController,
};
pub use view::{PlaybackView, TrackView};
