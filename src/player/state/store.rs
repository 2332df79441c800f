//! The single source of truth for a playback session.
//!
//! The store performs no I/O. The controller mutates it; the engine publishes a
//! [`PlaybackView`](crate::player::PlaybackView) projection whenever
//! [`PlaybackStore::revision`] moves.

use super::{MAX_PROGRESS_PERCENT, MAX_VOLUME, MIN_VOLUME, Transport};
use crate::error::{Boundary, InvalidStateError, PlaybackFault};
use crate::resource::ResourceHandle;
use crate::track::{Track, sanitize_tracks};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Partial update merged by [`PlaybackStore::set_transport`]. Outer `None`
/// leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub current_time: Option<f64>,
    pub duration: Option<Option<f64>>,
    pub resource: Option<Option<ResourceHandle>>,
    pub last_error: Option<Option<PlaybackFault>>,
}

impl StatePatch {
    pub fn error(fault: PlaybackFault) -> Self {
        Self {
            last_error: Some(Some(fault)),
            ..Self::default()
        }
    }

    pub fn clear_error() -> Self {
        Self {
            last_error: Some(None),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackStore {
    tracks: Arc<[Track]>,
    current_index: Option<usize>,
    transport: Transport,
    resource: Option<ResourceHandle>,
    duration: Option<f64>,
    current_time: f64,
    progress_percent: f64,
    volume: f32,
    is_muted: bool,
    last_error: Option<PlaybackFault>,
    revision: u64,
}

impl Default for PlaybackStore {
    fn default() -> Self {
        Self::new(1.0, false)
    }
}

impl PlaybackStore {
    pub fn new(volume: f32, is_muted: bool) -> Self {
        Self {
            tracks: Arc::from(Vec::new()),
            current_index: None,
            transport: Transport::Idle,
            resource: None,
            duration: None,
            current_time: 0.0,
            progress_percent: 0.0,
            volume: clamp_volume(volume).unwrap_or(MAX_VOLUME),
            is_muted,
            last_error: None,
            revision: 0,
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Replace the tracklist and reset the session to Idle. Tracks with blank
    /// text or a repeated id are dropped. An empty list leaves the store inert
    /// with no current track.
    pub fn set_tracklist(&mut self, tracks: Vec<Track>, start_index: usize) {
        let offered = tracks.len();
        let tracks = sanitize_tracks(tracks);
        let count = tracks.len();
        if count < offered {
            warn!(offered, kept = count, "Dropped blank or duplicate tracks");
        }
        self.tracks = Arc::from(tracks);
        self.current_index = if count == 0 {
            warn!("Tracklist is empty; playback stays idle");
            None
        } else {
            Some(start_index.min(count - 1))
        };
        self.transport = Transport::Idle;
        self.resource = None;
        self.last_error = None;
        self.reset_progress_fields();
        debug!(count, current_index = ?self.current_index, "Tracklist replaced");
        self.touch();
    }

    /// Atomically switch transport and merge a partial patch.
    pub fn set_transport(&mut self, transport: Transport, patch: StatePatch) {
        let previous = self.transport;
        self.transport = transport;
        if let Some(resource) = patch.resource {
            self.resource = resource;
        }
        if let Some(error) = patch.last_error {
            self.last_error = error;
        }
        match (patch.current_time, patch.duration) {
            (None, None) => {}
            (current_time, duration) => {
                if let Some(duration) = duration {
                    self.duration = duration;
                }
                let current_time = current_time.unwrap_or(self.current_time);
                self.apply_time(current_time);
            }
        }
        debug_assert!(!(self.is_playing() && self.transport == Transport::Error));
        if previous != transport {
            debug!(from = %previous, to = %transport, "Transport changed");
        }
        self.touch();
    }

    /// Feed a position report. Non-finite or negative durations are ignored and
    /// progress keeps its previous value.
    pub fn set_progress(&mut self, current_time: f64, duration: f64) {
        if !duration.is_finite() || duration < 0.0 || !current_time.is_finite() {
            trace!(current_time, duration, "Ignoring unusable progress report");
            return;
        }
        self.duration = Some(duration);
        self.apply_time(current_time);
        self.touch();
    }

    fn apply_time(&mut self, current_time: f64) {
        let current_time = if current_time.is_finite() {
            current_time.max(0.0)
        } else {
            0.0
        };
        match self.duration {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                self.current_time = current_time.min(duration);
                self.progress_percent =
                    (self.current_time / duration * 100.0).clamp(0.0, MAX_PROGRESS_PERCENT);
            }
            Some(duration) if duration.is_finite() && duration >= 0.0 => {
                self.current_time = 0.0;
                self.progress_percent = 0.0;
            }
            _ => {
                self.current_time = current_time;
                self.progress_percent = 0.0;
            }
        }
    }

    fn reset_progress_fields(&mut self) {
        self.duration = None;
        self.current_time = 0.0;
        self.progress_percent = 0.0;
    }

    /// Rewind to the start, keeping the known duration.
    pub fn reset_progress(&mut self) {
        self.current_time = 0.0;
        self.progress_percent = 0.0;
        self.touch();
    }

    pub fn advance_index(&mut self) -> Option<usize> {
        let index = self.current_index?;
        if index + 1 >= self.tracks.len() {
            return None;
        }
        self.current_index = Some(index + 1);
        self.touch();
        self.current_index
    }

    pub fn retreat_index(&mut self) -> Option<usize> {
        let index = self.current_index?;
        if index == 0 {
            return None;
        }
        self.current_index = Some(index - 1);
        self.touch();
        self.current_index
    }

    pub fn select_index(&mut self, index: usize) -> Result<(), InvalidStateError> {
        if self.tracks.is_empty() {
            return Err(InvalidStateError::NoTracks);
        }
        if index >= self.tracks.len() {
            return Err(InvalidStateError::OutOfRange {
                index,
                count: self.tracks.len(),
            });
        }
        self.current_index = Some(index);
        self.touch();
        Ok(())
    }

    /// The track after `after_id`, with its index.
    pub fn next_track(&self, after_id: &str) -> Option<(usize, &Track)> {
        let position = self.tracks.iter().position(|track| track.id == after_id)?;
        self.tracks
            .get(position + 1)
            .map(|track| (position + 1, track))
    }

    pub fn boundary_error(&self, forward: bool) -> InvalidStateError {
        if self.tracks.is_empty() {
            InvalidStateError::NoTracks
        } else if forward {
            InvalidStateError::AtBoundary(Boundary::Last)
        } else {
            InvalidStateError::AtBoundary(Boundary::First)
        }
    }

    /// Stores a clamped volume; non-finite input keeps the previous value.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        if let Some(volume) = clamp_volume(volume) {
            self.volume = volume;
            self.touch();
        } else {
            warn!(volume, "Ignoring non-finite volume");
        }
        self.volume
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.is_muted = !self.is_muted;
        self.touch();
        self.is_muted
    }

    pub fn effective_volume(&self) -> f32 {
        if self.is_muted { 0.0 } else { self.volume }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|index| self.tracks.get(index))
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track().map(|track| track.id.as_str())
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn is_loading(&self) -> bool {
        self.transport == Transport::Generating
    }

    pub fn resource(&self) -> Option<&ResourceHandle> {
        self.resource.as_ref()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn last_error(&self) -> Option<&PlaybackFault> {
        self.last_error.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    volume
        .is_finite()
        .then(|| volume.clamp(MIN_VOLUME, MAX_VOLUME))
}
