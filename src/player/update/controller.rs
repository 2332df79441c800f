//! The playback controller: the only component that drives the media primitive
//! and requests generation.
//!
//! Every command runs synchronously against the injected store and returns the
//! asynchronous work it needs as [`Effect`]s. Generation results carry the
//! request epoch they were issued under; anything stale is discarded and its
//! resource released, so a slow response for an abandoned track can never
//! replace the live one.

use super::{CommandResult, Effect, GenerationRequest};
use crate::error::{GenerationError, InvalidStateError, PlaybackError, PlaybackFault};
use crate::media::{MediaEvent, MediaPrimitive};
use crate::player::state::{PlaybackStore, StatePatch, Transport};
use crate::player::view::PlaybackView;
use crate::resource::{BlobStore, ResourceHandle};
use crate::scroll::ScrollSynchronizer;
use crate::track::Track;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub advance_delay: Duration,
    pub auto_advance: bool,
    pub auto_scroll: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&crate::config::AppConfig::default())
    }
}

impl From<&crate::config::AppConfig> for ControllerOptions {
    fn from(config: &crate::config::AppConfig) -> Self {
        Self {
            advance_delay: config.advance_delay(),
            auto_advance: config.auto_advance,
            auto_scroll: config.auto_scroll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Applied,
    Failed,
    Discarded,
}

#[derive(Debug)]
struct LiveResource {
    handle: ResourceHandle,
    track_id: String,
}

#[derive(Debug)]
struct InFlight {
    epoch: u64,
    track_id: String,
}

pub struct PlaybackController<M: MediaPrimitive> {
    pub(super) store: PlaybackStore,
    pub(super) media: M,
    pub(super) scroll: Box<dyn ScrollSynchronizer>,
    pub(super) options: ControllerOptions,
    pub(super) pending_advance: Option<super::advance::PendingAdvance>,
    pub(super) advance_seq: u64,
    blobs: BlobStore,
    live: Option<LiveResource>,
    epoch: u64,
    in_flight: Option<InFlight>,
}

impl<M: MediaPrimitive> PlaybackController<M> {
    pub fn new(
        store: PlaybackStore,
        mut media: M,
        blobs: BlobStore,
        scroll: Box<dyn ScrollSynchronizer>,
        options: ControllerOptions,
    ) -> Self {
        media.set_volume(store.effective_volume());
        Self {
            store,
            media,
            scroll,
            options,
            pending_advance: None,
            advance_seq: 0,
            blobs,
            live: None,
            epoch: 0,
            in_flight: None,
        }
    }

    pub fn store(&self) -> &PlaybackStore {
        &self.store
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn live_resource(&self) -> Option<&ResourceHandle> {
        self.live.as_ref().map(|live| &live.handle)
    }

    pub fn view(&self) -> PlaybackView {
        PlaybackView::project(&self.store, self.is_finished())
    }

    pub fn poll_media_events(&mut self) -> Vec<MediaEvent> {
        self.media.poll_events()
    }

    /// Ended with nothing left to advance to.
    pub fn is_finished(&self) -> bool {
        self.store.transport() == Transport::Ended && self.pending_advance.is_none()
    }

    /// Replace the tracklist, abandoning everything tied to the old one.
    pub fn load_tracklist(&mut self, tracks: Vec<Track>, start_index: usize) {
        self.cancel_pending_advance("tracklist replaced");
        self.invalidate_in_flight();
        self.media.pause();
        self.release_live();
        self.store.set_tracklist(tracks, start_index);
        info!(
            tracks = self.store.track_count(),
            start_index = ?self.store.current_index(),
            "Loaded narration tracklist"
        );
    }

    /// Resume the current track if its audio is attached, otherwise request
    /// generation for it.
    pub fn play_current(&mut self) -> CommandResult {
        if let Some(pending) = self.take_pending_advance() {
            debug!(next_index = pending.next_index, "Play pressed during advance window");
            self.store.select_index(pending.next_index)?;
        }

        let Some(track) = self.store.current_track().cloned() else {
            return Err(InvalidStateError::NoTracks);
        };
        let transport = self.store.transport();
        let generating_this = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.track_id == track.id);
        if transport == Transport::Playing || (transport == Transport::Generating && generating_this)
        {
            return Err(InvalidStateError::Transport {
                command: "play",
                transport,
            });
        }

        let attached = self
            .live
            .as_ref()
            .is_some_and(|live| live.track_id == track.id);
        if attached && transport != Transport::Error {
            if transport == Transport::Ended {
                self.media.set_current_time(0.0);
                self.store.reset_progress();
            }
            info!(track_id = %track.id, "Resuming narration");
            self.start_media(&track.id);
            return Ok(Vec::new());
        }

        Ok(vec![self.request_generation(&track)])
    }

    fn request_generation(&mut self, track: &Track) -> Effect {
        self.media.pause();
        self.epoch = self.epoch.wrapping_add(1);
        self.in_flight = Some(InFlight {
            epoch: self.epoch,
            track_id: track.id.clone(),
        });
        self.store.set_transport(
            Transport::Generating,
            StatePatch {
                current_time: Some(0.0),
                last_error: Some(None),
                ..StatePatch::default()
            },
        );
        info!(
            track_id = %track.id,
            epoch = self.epoch,
            chars = track.text.len(),
            "Requesting narration audio"
        );
        Effect::Generate(GenerationRequest {
            epoch: self.epoch,
            track_id: track.id.clone(),
            text: track.text.clone(),
        })
    }

    /// Apply a gateway result, unless a newer request superseded it.
    pub fn on_generation_finished(
        &mut self,
        epoch: u64,
        track_id: &str,
        result: Result<ResourceHandle, GenerationError>,
    ) -> GenerationOutcome {
        let is_current = epoch == self.epoch
            && self
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.epoch == epoch && in_flight.track_id == track_id);
        if !is_current {
            debug!(
                epoch,
                current = self.epoch,
                track_id,
                "Ignoring stale generation result"
            );
            if let Ok(handle) = result {
                self.blobs.revoke(&handle);
            }
            return GenerationOutcome::Discarded;
        }
        self.in_flight = None;

        let handle = match result {
            Ok(handle) => handle,
            Err(err) => {
                warn!(track_id, "Narration generation failed: {err}");
                self.store
                    .set_transport(Transport::Error, StatePatch::error(err.into()));
                return GenerationOutcome::Failed;
            }
        };

        self.release_live();
        if let Err(err) = self.media.attach(&handle) {
            warn!(track_id, handle = %handle, "Attaching narration audio failed: {err}");
            self.blobs.revoke(&handle);
            self.store
                .set_transport(Transport::Error, StatePatch::error(err.into()));
            return GenerationOutcome::Failed;
        }
        self.live = Some(LiveResource {
            handle: handle.clone(),
            track_id: track_id.to_string(),
        });
        self.media.set_volume(self.store.effective_volume());
        self.store.set_transport(
            Transport::Ready,
            StatePatch {
                current_time: Some(0.0),
                duration: Some(self.media.duration()),
                resource: Some(Some(handle)),
                ..StatePatch::default()
            },
        );
        self.start_media(track_id);
        GenerationOutcome::Applied
    }

    fn start_media(&mut self, track_id: &str) {
        match self.media.play() {
            Ok(()) => {
                debug!(track_id, "Narration playing");
                self.store
                    .set_transport(Transport::Playing, StatePatch::clear_error());
            }
            Err(err) => self.fail_playback(err),
        }
    }

    pub fn pause(&mut self) -> CommandResult {
        let transport = self.store.transport();
        match transport {
            Transport::Playing => {
                self.media.pause();
                self.store.set_transport(
                    Transport::Paused,
                    StatePatch {
                        current_time: Some(self.media.current_time()),
                        ..StatePatch::default()
                    },
                );
                info!(current_time = self.store.current_time(), "Paused narration");
                Ok(Vec::new())
            }
            Transport::Ended if self.pending_advance.is_some() => {
                self.park_on_next_track();
                Ok(Vec::new())
            }
            _ => Err(InvalidStateError::Transport {
                command: "pause",
                transport,
            }),
        }
    }

    /// Halt output, rewind, and drop any pending generation or advance.
    pub fn stop(&mut self) -> CommandResult {
        self.cancel_pending_advance("stopped");
        self.invalidate_in_flight();
        self.media.pause();
        self.media.set_current_time(0.0);
        self.store.set_transport(
            Transport::Idle,
            StatePatch {
                current_time: Some(0.0),
                last_error: Some(None),
                ..StatePatch::default()
            },
        );
        self.store.reset_progress();
        info!("Stopped narration");
        Ok(Vec::new())
    }

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.store.set_volume(volume);
        self.apply_volume()
    }

    pub fn toggle_mute(&mut self) -> f32 {
        let muted = self.store.toggle_mute();
        debug!(muted, "Toggled mute");
        self.apply_volume()
    }

    fn apply_volume(&mut self) -> f32 {
        let effective = self.store.effective_volume();
        self.media.set_volume(effective);
        effective
    }

    pub fn next(&mut self) -> CommandResult {
        self.cancel_pending_advance("skipped forward");
        if self.store.advance_index().is_none() {
            return Err(self.store.boundary_error(true));
        }
        self.switch_track()
    }

    pub fn previous(&mut self) -> CommandResult {
        self.cancel_pending_advance("skipped backward");
        if self.store.retreat_index().is_none() {
            return Err(self.store.boundary_error(false));
        }
        self.switch_track()
    }

    pub fn jump_to(&mut self, index: usize) -> CommandResult {
        self.store.select_index(index)?;
        self.cancel_pending_advance("jumped");
        self.switch_track()
    }

    fn switch_track(&mut self) -> CommandResult {
        self.invalidate_in_flight();
        self.media.pause();
        self.store.set_transport(Transport::Idle, StatePatch::default());
        self.play_current()
    }

    pub fn on_media_event(&mut self, event: MediaEvent) -> CommandResult {
        match event {
            MediaEvent::LoadedMetadata { duration } => {
                self.store.set_progress(self.media.current_time(), duration);
                Ok(Vec::new())
            }
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                if let Some(duration) = duration {
                    self.store.set_progress(current_time, duration);
                }
                Ok(Vec::new())
            }
            MediaEvent::Ended => self.on_track_ended(),
            MediaEvent::Error(err) => {
                self.on_media_error(err);
                Ok(Vec::new())
            }
        }
    }

    /// Media fault: surface it and never advance.
    pub fn on_media_error(&mut self, err: PlaybackError) {
        self.cancel_pending_advance("media error");
        self.fail_playback(err);
    }

    fn fail_playback(&mut self, err: PlaybackError) {
        warn!(track_id = ?self.store.current_track_id(), "Narration playback failed: {err}");
        self.media.pause();
        self.store
            .set_transport(Transport::Error, StatePatch::error(PlaybackFault::from(err)));
    }

    fn invalidate_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(
                epoch = in_flight.epoch,
                track_id = %in_flight.track_id,
                "Abandoning in-flight generation"
            );
            self.epoch = self.epoch.wrapping_add(1);
        }
    }

    fn release_live(&mut self) {
        if let Some(live) = self.live.take() {
            self.media.detach();
            self.blobs.revoke(&live.handle);
            self.store.set_transport(
                self.store.transport(),
                StatePatch {
                    resource: Some(None),
                    ..StatePatch::default()
                },
            );
            debug!(handle = %live.handle, track_id = %live.track_id, "Released narration audio");
        }
    }

    /// Teardown: cancel timers, drop pending work, release the live handle.
    pub fn shutdown(&mut self) {
        self.cancel_pending_advance("shutdown");
        self.invalidate_in_flight();
        self.media.pause();
        self.release_live();
    }
}

impl<M: MediaPrimitive> Drop for PlaybackController<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct FakeMedia {
        pub attached: Option<ResourceHandle>,
        pub attach_count: usize,
        pub playing: bool,
        pub volume: f32,
        pub position: f64,
        pub rewinds: usize,
        pub fail_play: bool,
    }

    impl MediaPrimitive for FakeMedia {
        fn attach(&mut self, handle: &ResourceHandle) -> Result<(), PlaybackError> {
            self.attached = Some(handle.clone());
            self.attach_count += 1;
            self.position = 0.0;
            Ok(())
        }

        fn detach(&mut self) {
            self.attached = None;
            self.playing = false;
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            if self.fail_play {
                return Err(PlaybackError::Output("device busy".into()));
            }
            if self.attached.is_none() {
                return Err(PlaybackError::NothingAttached);
            }
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn set_current_time(&mut self, seconds: f64) {
            self.position = seconds;
            self.rewinds += 1;
        }

        fn current_time(&self) -> f64 {
            self.position
        }

        fn duration(&self) -> Option<f64> {
            self.attached.as_ref().map(|_| 4.0)
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn poll_events(&mut self) -> Vec<MediaEvent> {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeMedia;
    use super::*;
    use crate::scroll::RecordingScroll;
    use crate::track::track;

    fn controller(scroll: RecordingScroll) -> (PlaybackController<FakeMedia>, BlobStore) {
        let blobs = BlobStore::new();
        let mut controller = PlaybackController::new(
            PlaybackStore::default(),
            FakeMedia::default(),
            blobs.clone(),
            Box::new(scroll),
            ControllerOptions::default(),
        );
        controller.load_tracklist(
            vec![track("a", "Intro"), track("b", "Middle"), track("c", "Outro")],
            0,
        );
        (controller, blobs)
    }

    fn generate(effects: &[Effect]) -> GenerationRequest {
        match effects {
            [Effect::Generate(request)] => request.clone(),
            other => panic!("expected one generation effect, got {other:?}"),
        }
    }

    fn play_to_playing(
        controller: &mut PlaybackController<FakeMedia>,
        blobs: &BlobStore,
    ) -> ResourceHandle {
        let request = generate(&controller.play_current().unwrap());
        let handle = blobs.create(vec![1, 2, 3]);
        let outcome =
            controller.on_generation_finished(request.epoch, &request.track_id, Ok(handle.clone()));
        assert_eq!(outcome, GenerationOutcome::Applied);
        handle
    }

    #[test]
    fn play_generates_then_plays() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let request = generate(&controller.play_current().unwrap());
        assert_eq!(request.track_id, "a");
        assert_eq!(request.text, "Intro");
        assert_eq!(controller.store().transport(), Transport::Generating);
        assert!(controller.store().is_loading());

        let handle = blobs.create(vec![9]);
        controller.on_generation_finished(request.epoch, "a", Ok(handle.clone()));
        assert_eq!(controller.store().transport(), Transport::Playing);
        assert_eq!(controller.store().resource(), Some(&handle));
        assert_eq!(controller.store().duration(), Some(4.0));
        assert!(controller.media().playing);
    }

    #[test]
    fn generation_failure_sets_error_and_retry_regenerates() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let request = generate(&controller.play_current().unwrap());
        controller.on_generation_finished(
            request.epoch,
            "a",
            Err(GenerationError::Status {
                status: 503,
                message: "busy".into(),
            }),
        );
        assert_eq!(controller.store().transport(), Transport::Error);
        assert!(matches!(
            controller.store().last_error(),
            Some(PlaybackFault::Generation(_))
        ));
        assert_eq!(controller.store().current_index(), Some(0));
        assert!(!controller.media().playing);

        let retry = generate(&controller.play_current().unwrap());
        assert_eq!(retry.track_id, "a");
        assert!(retry.epoch > request.epoch);
        assert!(controller.store().last_error().is_none());
        controller.on_generation_finished(retry.epoch, "a", Ok(blobs.create(vec![1])));
        assert_eq!(controller.store().transport(), Transport::Playing);
    }

    #[test]
    fn pause_and_resume_reuse_the_attached_resource() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let handle = play_to_playing(&mut controller, &blobs);
        controller.pause().unwrap();
        assert_eq!(controller.store().transport(), Transport::Paused);
        assert!(controller.play_current().unwrap().is_empty());
        assert_eq!(controller.store().transport(), Transport::Playing);
        assert_eq!(controller.media().attach_count, 1);
        assert_eq!(controller.live_resource(), Some(&handle));
    }

    #[test]
    fn invalid_commands_are_rejected_without_side_effects() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let revision = controller.store().revision();
        assert_eq!(
            controller.pause().unwrap_err(),
            InvalidStateError::Transport {
                command: "pause",
                transport: Transport::Idle
            }
        );
        assert_eq!(controller.store().revision(), revision);

        let request = generate(&controller.play_current().unwrap());
        assert_eq!(
            controller.play_current().unwrap_err(),
            InvalidStateError::Transport {
                command: "play",
                transport: Transport::Generating
            }
        );
        assert_eq!(controller.epoch(), request.epoch);
        controller.on_generation_finished(request.epoch, "a", Ok(blobs.create(vec![1])));
        assert!(matches!(
            controller.play_current(),
            Err(InvalidStateError::Transport { command: "play", .. })
        ));
        assert_eq!(controller.previous().unwrap_err().to_string(), "already at the first track");
    }

    #[test]
    fn empty_tracklist_rejects_play() {
        let (mut controller, _blobs) = controller(RecordingScroll::new());
        controller.load_tracklist(Vec::new(), 0);
        assert_eq!(controller.play_current().unwrap_err(), InvalidStateError::NoTracks);
        assert_eq!(controller.next().unwrap_err(), InvalidStateError::NoTracks);
        assert_eq!(controller.store().transport(), Transport::Idle);
    }

    #[test]
    fn stale_generation_result_is_discarded_and_released() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let first = generate(&controller.play_current().unwrap());
        let second = generate(&controller.next().unwrap());
        assert_eq!(second.track_id, "b");

        let late = blobs.create(vec![1]);
        let outcome = controller.on_generation_finished(first.epoch, "a", Ok(late.clone()));
        assert_eq!(outcome, GenerationOutcome::Discarded);
        assert!(!blobs.is_live(&late));
        assert_eq!(blobs.revocation_count(&late), 1);
        assert_eq!(controller.store().transport(), Transport::Generating);
        assert!(controller.media().attached.is_none());

        let fresh = blobs.create(vec![2]);
        controller.on_generation_finished(second.epoch, "b", Ok(fresh.clone()));
        assert_eq!(controller.live_resource(), Some(&fresh));
        assert_eq!(controller.store().current_track_id(), Some("b"));
    }

    #[test]
    fn stop_invalidates_in_flight_generation() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let request = generate(&controller.play_current().unwrap());
        controller.stop().unwrap();
        let handle = blobs.create(vec![1]);
        assert_eq!(
            controller.on_generation_finished(request.epoch, "a", Ok(handle)),
            GenerationOutcome::Discarded
        );
        assert_eq!(controller.store().transport(), Transport::Idle);
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn stop_after_a_failure_clears_the_error() {
        let (mut controller, _blobs) = controller(RecordingScroll::new());
        let request = generate(&controller.play_current().unwrap());
        controller.on_generation_finished(request.epoch, "a", Err(GenerationError::EmptyPayload));
        assert!(controller.store().last_error().is_some());

        controller.stop().unwrap();
        assert_eq!(controller.store().transport(), Transport::Idle);
        assert!(controller.store().last_error().is_none());
        assert!(controller.view().error.is_none());
    }

    #[test]
    fn shutdown_cancels_the_advance_window() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        play_to_playing(&mut controller, &blobs);
        let effects = controller.on_media_event(MediaEvent::Ended).unwrap();
        let [Effect::ScheduleAdvance(ticket)] = effects.as_slice() else {
            panic!("expected an advance, got {effects:?}");
        };
        let ticket = ticket.clone();
        assert!(!ticket.token.is_cancelled());

        drop(controller);
        assert!(ticket.token.is_cancelled());
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn stop_rewinds_and_play_restarts_without_regenerating() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        play_to_playing(&mut controller, &blobs);
        controller.on_media_event(MediaEvent::TimeUpdate {
            current_time: 2.0,
            duration: Some(4.0),
        })
        .unwrap();
        assert_eq!(controller.store().progress_percent(), 50.0);
        controller.stop().unwrap();
        assert_eq!(controller.store().transport(), Transport::Idle);
        assert_eq!(controller.store().progress_percent(), 0.0);
        assert_eq!(controller.media().position, 0.0);
        assert!(controller.play_current().unwrap().is_empty());
        assert_eq!(controller.store().transport(), Transport::Playing);
    }

    #[test]
    fn exactly_one_live_resource_across_tracks() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        let mut handles = vec![play_to_playing(&mut controller, &blobs)];
        for _ in 0..2 {
            let request = generate(&controller.next().unwrap());
            let handle = blobs.create(vec![0]);
            controller.on_generation_finished(request.epoch, &request.track_id, Ok(handle.clone()));
            handles.push(handle);
            assert_eq!(blobs.live_count(), 1);
        }
        let request = generate(&controller.previous().unwrap());
        let handle = blobs.create(vec![0]);
        controller.on_generation_finished(request.epoch, &request.track_id, Ok(handle.clone()));
        handles.push(handle.clone());

        assert_eq!(blobs.live_count(), 1);
        for released in &handles[..handles.len() - 1] {
            assert_eq!(blobs.revocation_count(released), 1);
        }
        drop(controller);
        assert_eq!(blobs.live_count(), 0);
        assert_eq!(blobs.revocation_count(&handle), 1);
    }

    #[test]
    fn volume_survives_a_mute_cycle() {
        let (mut controller, _blobs) = controller(RecordingScroll::new());
        assert_eq!(controller.set_volume(0.7), 0.7);
        assert_eq!(controller.toggle_mute(), 0.0);
        assert_eq!(controller.media().volume, 0.0);
        assert_eq!(controller.toggle_mute(), 0.7);
        assert_eq!(controller.media().volume, 0.7);
    }

    #[test]
    fn media_error_never_moves_the_index() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        play_to_playing(&mut controller, &blobs);
        controller
            .on_media_event(MediaEvent::Error(PlaybackError::Decode("bad frame".into())))
            .unwrap();
        assert_eq!(controller.store().transport(), Transport::Error);
        assert_eq!(controller.store().current_index(), Some(0));
        assert!(!controller.store().is_playing());
        assert!(controller.pending_advance.is_none());
        assert!(matches!(
            controller.store().last_error(),
            Some(PlaybackFault::Playback(_))
        ));
    }

    #[test]
    fn play_failure_after_generation_surfaces_playback_error() {
        let (mut controller, blobs) = controller(RecordingScroll::new());
        controller.media.fail_play = true;
        let request = generate(&controller.play_current().unwrap());
        controller.on_generation_finished(request.epoch, "a", Ok(blobs.create(vec![1])));
        assert_eq!(controller.store().transport(), Transport::Error);
        assert_eq!(blobs.live_count(), 1);
    }
}
