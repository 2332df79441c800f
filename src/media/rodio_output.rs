//! Audible output through `rodio`, enabled with the `audio-output` feature.

use super::{FALLBACK_DURATION_SECS, MediaEvent, MediaPrimitive};
use crate::error::PlaybackError;
use crate::resource::{BlobStore, ResourceHandle};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct RodioMedia {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    blobs: BlobStore,
    source: Option<(ResourceHandle, Arc<[u8]>)>,
    sink: Option<Sink>,
    duration: Option<f64>,
    started_at: Option<Instant>,
    elapsed: Duration,
    volume: f32,
    ended: bool,
    pending: Vec<MediaEvent>,
}

impl RodioMedia {
    pub fn new(blobs: BlobStore) -> Result<Self, PlaybackError> {
        let (_stream, handle) =
            OutputStream::try_default().map_err(|err| PlaybackError::Output(err.to_string()))?;
        info!("Opened default audio output");
        Ok(Self {
            _stream,
            handle,
            blobs,
            source: None,
            sink: None,
            duration: None,
            started_at: None,
            elapsed: Duration::ZERO,
            volume: 1.0,
            ended: false,
            pending: Vec::new(),
        })
    }

    /// Build a paused sink holding the whole clip.
    fn load_sink(&mut self, bytes: Arc<[u8]>) -> Result<f64, PlaybackError> {
        let decoder =
            Decoder::new(Cursor::new(bytes)).map_err(|err| PlaybackError::Decode(err.to_string()))?;
        let duration = decoder
            .total_duration()
            .map(|d| d.as_secs_f64())
            .unwrap_or(FALLBACK_DURATION_SECS);
        let sink = Sink::try_new(&self.handle).map_err(|err| PlaybackError::Output(err.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(decoder);
        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
        self.started_at = None;
        self.elapsed = Duration::ZERO;
        self.ended = false;
        Ok(duration)
    }

    fn position(&self) -> f64 {
        let running = self
            .started_at
            .map(|started| Instant::now().saturating_duration_since(started))
            .unwrap_or(Duration::ZERO);
        let position = (self.elapsed + running).as_secs_f64();
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl MediaPrimitive for RodioMedia {
    fn attach(&mut self, handle: &ResourceHandle) -> Result<(), PlaybackError> {
        let bytes = self
            .blobs
            .resolve(handle)
            .ok_or_else(|| PlaybackError::UnknownResource(handle.url().to_string()))?;
        let duration = self.load_sink(Arc::clone(&bytes))?;
        debug!(handle = %handle, duration, "Attached audio source");
        self.source = Some((handle.clone(), bytes));
        self.duration = Some(duration);
        self.pending.push(MediaEvent::LoadedMetadata { duration });
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.source = None;
        self.duration = None;
        self.started_at = None;
        self.elapsed = Duration::ZERO;
        self.ended = false;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let sink = self.sink.as_ref().ok_or(PlaybackError::NothingAttached)?;
        sink.play();
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        if let Some(started) = self.started_at.take() {
            self.elapsed += Instant::now().saturating_duration_since(started);
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        if seconds > 0.0 {
            warn!(seconds, "Seeking inside a clip is not supported; ignoring");
            return;
        }
        let Some((_, bytes)) = self.source.clone() else {
            return;
        };
        let was_playing = self.started_at.is_some();
        match self.load_sink(bytes) {
            Ok(_) if was_playing => {
                if let Err(err) = self.play() {
                    self.pending.push(MediaEvent::Error(err));
                }
            }
            Ok(_) => {}
            Err(err) => self.pending.push(MediaEvent::Error(err)),
        }
    }

    fn current_time(&self) -> f64 {
        self.position()
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if self.started_at.is_some() {
            events.push(MediaEvent::TimeUpdate {
                current_time: self.position(),
                duration: self.duration,
            });
            let drained = self.sink.as_ref().is_some_and(Sink::empty);
            if drained && !self.ended {
                self.ended = true;
                self.pause();
                events.push(MediaEvent::Ended);
            }
        }
        events
    }
}
