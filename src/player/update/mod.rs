use crate::cancellation::CancellationToken;
use crate::error::InvalidStateError;
use std::time::Duration;

mod advance;
mod controller;
mod runtime;

pub use controller::{ControllerOptions, GenerationOutcome, PlaybackController};
pub use runtime::{EngineHandle, NarrationEngine};

/// Work the controller cannot do synchronously; the engine loop performs it and
/// reports back with a [`Message`](super::messages::Message).
#[derive(Debug, Clone)]
pub enum Effect {
    Generate(GenerationRequest),
    ScheduleAdvance(AdvanceTicket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub epoch: u64,
    pub track_id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct AdvanceTicket {
    pub id: u64,
    pub delay: Duration,
    pub token: CancellationToken,
}

pub type CommandResult = Result<Vec<Effect>, InvalidStateError>;
