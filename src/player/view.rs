//! Serializable projection of the playback state for the UI layer.

use super::state::{PlaybackStore, Transport};
use crate::track::{Track, TrackKind};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct TrackView {
    pub id: String,
    pub title: String,
    pub kind: TrackKind,
    pub anchor_id: String,
}

impl From<&Track> for TrackView {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            kind: track.kind,
            anchor_id: track.anchor_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PlaybackView {
    pub transport: Transport,
    pub is_playing: bool,
    pub is_loading: bool,
    pub duration: Option<f64>,
    pub current_time: f64,
    pub progress_percent: f64,
    pub volume: f32,
    pub effective_volume: f32,
    pub is_muted: bool,
    pub error: Option<String>,
    pub current_track: Option<TrackView>,
    pub track_index: Option<usize>,
    pub track_count: usize,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    /// The last track ended and nothing is queued.
    pub finished: bool,
    #[ts(type = "number")]
    pub revision: u64,
}

impl PlaybackView {
    pub fn project(store: &PlaybackStore, finished: bool) -> Self {
        let index = store.current_index();
        let count = store.track_count();
        Self {
            transport: store.transport(),
            is_playing: store.is_playing(),
            is_loading: store.is_loading(),
            duration: store.duration(),
            current_time: store.current_time(),
            progress_percent: store.progress_percent(),
            volume: store.volume(),
            effective_volume: store.effective_volume(),
            is_muted: store.is_muted(),
            error: store.last_error().map(|fault| fault.message()),
            current_track: store.current_track().map(TrackView::from),
            track_index: index,
            track_count: count,
            can_go_next: index.is_some_and(|i| i + 1 < count),
            can_go_previous: index.is_some_and(|i| i > 0),
            finished,
            revision: store.revision(),
        }
    }
}

impl Default for PlaybackView {
    fn default() -> Self {
        Self::project(&PlaybackStore::default(), false)
    }
}
