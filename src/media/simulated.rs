//! Clock-driven media primitive.
//!
//! Plays nothing audible: it resolves the attached blob, reads the clip length
//! from its WAV header, and advances a position against the tokio clock so the
//! full transport event flow (time updates, ended) can run headless.

use super::{FALLBACK_DURATION_SECS, MediaEvent, MediaPrimitive};
use crate::error::PlaybackError;
use crate::resource::{BlobStore, ResourceHandle};
use std::io::Cursor;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Clip length in seconds, read from a WAV header; falls back to one second.
pub fn audio_duration_secs(bytes: &[u8]) -> f64 {
    hound::WavReader::new(Cursor::new(bytes))
        .ok()
        .and_then(|reader| {
            let rate = reader.spec().sample_rate;
            (rate > 0).then(|| f64::from(reader.duration()) / f64::from(rate))
        })
        .unwrap_or(FALLBACK_DURATION_SECS)
}

pub struct SimulatedMedia {
    blobs: BlobStore,
    attached: Option<ResourceHandle>,
    duration: Option<f64>,
    position: f64,
    started_at: Option<Instant>,
    volume: f32,
    ended: bool,
    pending: Vec<MediaEvent>,
}

impl SimulatedMedia {
    pub fn new(blobs: BlobStore) -> Self {
        Self {
            blobs,
            attached: None,
            duration: None,
            position: 0.0,
            started_at: None,
            volume: 1.0,
            ended: false,
            pending: Vec::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn settle_position(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.position = self.position_at(started);
        }
    }

    fn position_at(&self, started: Instant) -> f64 {
        let elapsed = Instant::now().saturating_duration_since(started).as_secs_f64();
        let position = self.position + elapsed;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl MediaPrimitive for SimulatedMedia {
    fn attach(&mut self, handle: &ResourceHandle) -> Result<(), PlaybackError> {
        let bytes = self
            .blobs
            .resolve(handle)
            .ok_or_else(|| PlaybackError::UnknownResource(handle.url().to_string()))?;
        let duration = audio_duration_secs(&bytes);
        debug!(handle = %handle, duration, "Attached simulated source");
        self.attached = Some(handle.clone());
        self.duration = Some(duration);
        self.position = 0.0;
        self.started_at = None;
        self.ended = false;
        self.pending.push(MediaEvent::LoadedMetadata { duration });
        Ok(())
    }

    fn detach(&mut self) {
        self.attached = None;
        self.duration = None;
        self.position = 0.0;
        self.started_at = None;
        self.ended = false;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.attached.is_none() {
            return Err(PlaybackError::NothingAttached);
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.settle_position();
    }

    fn set_current_time(&mut self, seconds: f64) {
        let playing = self.started_at.is_some();
        let upper = self.duration.unwrap_or(f64::MAX);
        self.position = seconds.clamp(0.0, upper);
        self.started_at = playing.then(Instant::now);
        self.ended = false;
    }

    fn current_time(&self) -> f64 {
        match self.started_at {
            Some(started) => self.position_at(started),
            None => self.position,
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if let Some(started) = self.started_at {
            let current_time = self.position_at(started);
            trace!(current_time, "Simulated time update");
            events.push(MediaEvent::TimeUpdate {
                current_time,
                duration: self.duration,
            });
            let finished = self.duration.is_some_and(|d| current_time >= d);
            if finished && !self.ended {
                self.ended = true;
                self.settle_position();
                events.push(MediaEvent::Ended);
            }
        }
        events
    }
}

#[cfg(test)]
pub(crate) fn wav_bytes(seconds: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let samples = (seconds * 8_000.0).round() as u32;
        for _ in 0..samples {
            writer.write_sample(0i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reads_wav_duration_and_falls_back() {
        assert!((audio_duration_secs(&wav_bytes(0.5)) - 0.5).abs() < 1e-6);
        assert_eq!(audio_duration_secs(b"ID3 not a wav"), FALLBACK_DURATION_SECS);
    }

    #[test]
    fn unknown_resource_fails_to_attach() {
        let blobs = BlobStore::new();
        let handle = blobs.create(wav_bytes(0.1));
        blobs.revoke(&handle);
        let mut media = SimulatedMedia::new(blobs);
        assert!(matches!(
            media.attach(&handle),
            Err(PlaybackError::UnknownResource(_))
        ));
        assert_eq!(media.play(), Err(PlaybackError::NothingAttached));
    }

    #[tokio::test(start_paused = true)]
    async fn emits_metadata_updates_and_a_single_ended() {
        let blobs = BlobStore::new();
        let handle = blobs.create(wav_bytes(1.0));
        let mut media = SimulatedMedia::new(blobs);
        media.attach(&handle).unwrap();
        media.play().unwrap();
        assert_eq!(
            media.poll_events().first(),
            Some(&MediaEvent::LoadedMetadata { duration: 1.0 })
        );

        tokio::time::advance(Duration::from_millis(400)).await;
        media.pause();
        let paused_at = media.current_time();
        assert!((paused_at - 0.4).abs() < 1e-3);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(media.current_time(), paused_at);
        assert!(media.poll_events().is_empty());

        media.play().unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        let events = media.poll_events();
        assert_eq!(events.last(), Some(&MediaEvent::Ended));
        assert!(!media.is_playing());
        assert!(media.poll_events().is_empty());
    }
}
