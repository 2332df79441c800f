//! The platform audio-playback primitive the controller drives.
//!
//! Implementations mirror an HTML audio element: a settable source, play/pause,
//! current time, duration, volume, and a queue of transport events the engine
//! drains on every tick.

use crate::error::PlaybackError;
use crate::resource::ResourceHandle;

#[cfg(feature = "audio-output")]
mod rodio_output;
mod simulated;

#[cfg(feature = "audio-output")]
pub use rodio_output::RodioMedia;
pub use simulated::{SimulatedMedia, audio_duration_secs};
#[cfg(test)]
pub(crate) use simulated::wav_bytes;

/// Duration assumed for audio whose length cannot be read from its header.
pub const FALLBACK_DURATION_SECS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    TimeUpdate { current_time: f64, duration: Option<f64> },
    Ended,
    Error(PlaybackError),
}

pub trait MediaPrimitive {
    /// Load a resource as the new source, replacing any previous one.
    fn attach(&mut self, handle: &ResourceHandle) -> Result<(), PlaybackError>;
    fn detach(&mut self);
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    fn current_time(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn set_volume(&mut self, volume: f32);
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

impl<M: MediaPrimitive + ?Sized> MediaPrimitive for Box<M> {
    fn attach(&mut self, handle: &ResourceHandle) -> Result<(), PlaybackError> {
        (**self).attach(handle)
    }

    fn detach(&mut self) {
        (**self).detach()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn set_current_time(&mut self, seconds: f64) {
        (**self).set_current_time(seconds)
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn duration(&self) -> Option<f64> {
        (**self).duration()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        (**self).poll_events()
    }
}
