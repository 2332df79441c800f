use crate::error::GenerationError;
use crate::resource::ResourceHandle;
use crate::track::Track;

/// Commands accepted from the UI.
#[derive(Debug, Clone)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    JumpTo(usize),
    SetVolume(f32),
    ToggleMute,
    LoadTracklist { tracks: Vec<Track>, start_index: usize },
    Shutdown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::JumpTo(_) => "jump_to",
            Self::SetVolume(_) => "set_volume",
            Self::ToggleMute => "toggle_mute",
            Self::LoadTracklist { .. } => "load_tracklist",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Completions reported back to the engine loop by spawned work.
#[derive(Debug)]
pub(crate) enum Message {
    GenerationFinished {
        epoch: u64,
        track_id: String,
        result: Result<ResourceHandle, GenerationError>,
    },
    AdvanceDue {
        ticket: u64,
    },
}
